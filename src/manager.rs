//! Session manager for the hosted auth provider.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owns the current user/session pair for the application's lifetime and
//! publishes it through a `watch` channel. Callers run sign-in/sign-up and
//! observe the resulting state change; they never mutate state directly.
//!
//! DESIGN
//! ======
//! - Startup subscribes to provider events *before* fetching the current
//!   session. A transition that lands while the fetch is pending is kept;
//!   the (possibly stale) fetch result only fills state when no push has
//!   been seen yet.
//! - Sign-in/sign-up retry transient failures with capped backoff. Their
//!   return values do not touch state; the provider's push does.
//! - Sign-out and reset clear local state immediately rather than waiting
//!   for a provider event that may never arrive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::{MOBILE_METADATA_KEY, synthetic_email};
use crate::provider::{AuthProvider, SignUpOptions, Subscription};
use crate::retry::{RetryPolicy, retry_transient};
use crate::store::{KeyValueStore, remove_prefixed};
use crate::types::{AuthData, AuthEvent, AuthSnapshot, Session};

/// Per-manager settings derived from [`AuthConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub email_domain: String,
    pub email_redirect_to: String,
    pub storage_prefix: String,
    pub retry: RetryPolicy,
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            email_domain: config.email_domain.clone(),
            email_redirect_to: config.email_redirect_to(),
            storage_prefix: config.storage_prefix.clone(),
            retry: config.retry,
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn KeyValueStore>,
    settings: SessionSettings,
    state: Arc<watch::Sender<AuthSnapshot>>,
    pushed: Arc<AtomicBool>,
    /// Cleared by `teardown`; read and written only under the watch lock.
    active: Arc<AtomicBool>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionManager {
    /// Subscribe to `provider`, then resolve the current session.
    ///
    /// Returns once the initial fetch has resolved; `loading` is false from
    /// then on. A failed fetch is logged and treated as signed out.
    pub async fn start(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn KeyValueStore>,
        settings: SessionSettings,
    ) -> Self {
        let manager = Self::subscribe(provider, store, settings);
        manager.resolve_initial_session().await;
        manager
    }

    fn subscribe(provider: Arc<dyn AuthProvider>, store: Arc<dyn KeyValueStore>, settings: SessionSettings) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::pending());
        let state = Arc::new(state);
        let pushed = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));

        let subscription = {
            let state = Arc::clone(&state);
            let pushed = Arc::clone(&pushed);
            let active = Arc::clone(&active);
            provider.on_auth_state_change(Arc::new(move |event: AuthEvent, session: Option<&Session>| {
                // A callback already cloned out of the listener table can still
                // fire after teardown; the flag check under the lock drops it.
                state.send_if_modified(|snapshot| {
                    if !active.load(Ordering::SeqCst) {
                        return false;
                    }
                    pushed.store(true, Ordering::SeqCst);
                    debug!(?event, authenticated = session.is_some(), "auth state change");
                    *snapshot = AuthSnapshot::resolved(session.cloned());
                    true
                });
            }))
        };

        Self {
            provider,
            store,
            settings,
            state,
            pushed,
            active,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    async fn resolve_initial_session(&self) {
        let fetched = match self.provider.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "initial session fetch failed; starting signed out");
                None
            }
        };
        // The pushed check and the write share the watch lock with the
        // callback, so a push either lands first or overwrites this result.
        self.state.send_modify(|snapshot| {
            if self.pushed.load(Ordering::SeqCst) {
                snapshot.loading = false;
            } else {
                *snapshot = AuthSnapshot::resolved(fetched);
            }
        });
        info!(authenticated = self.state.borrow().is_authenticated(), "initial session resolved");
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Sign in with a mobile number and password.
    ///
    /// # Errors
    ///
    /// Returns the first terminal error, or the last transient error once
    /// retries are exhausted.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        let email = synthetic_email(identifier, &self.settings.email_domain);
        retry_transient(&self.settings.retry, "sign_in", |_| {
            self.provider.sign_in_with_password(&email, password)
        })
        .await
    }

    /// Register a mobile number and password.
    ///
    /// # Errors
    ///
    /// Same classification and exhaustion behavior as [`Self::sign_in`].
    pub async fn sign_up(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        let email = synthetic_email(identifier, &self.settings.email_domain);
        let mut data = Map::new();
        data.insert(MOBILE_METADATA_KEY.to_owned(), Value::String(identifier.trim().to_owned()));
        let options = SignUpOptions { email_redirect_to: Some(self.settings.email_redirect_to.clone()), data };
        retry_transient(&self.settings.retry, "sign_up", |_| {
            self.provider.sign_up(&email, password, &options)
        })
        .await
    }

    /// End the session with the provider (single attempt).
    ///
    /// Local state is cleared whether or not the provider call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the provider's sign-out error, if any.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.provider.sign_out().await;
        if let Err(e) = &result {
            warn!(error = %e, "provider sign-out failed; clearing local session anyway");
        }
        self.clear_local_state();
        result
    }

    /// Recover from corrupted or endlessly refreshing stored credentials.
    ///
    /// Signs out (ignoring failures), removes every persisted key in the
    /// provider namespace, and clears local state. Never fails.
    pub async fn reset_auth(&self) {
        if let Err(e) = self.provider.sign_out().await {
            debug!(error = %e, "sign-out during reset failed; ignoring");
        }
        match remove_prefixed(self.store.as_ref(), &self.settings.storage_prefix) {
            Ok(removed) => info!(removed, prefix = %self.settings.storage_prefix, "cleared persisted auth keys"),
            Err(e) => warn!(error = %e, "listing persisted keys during reset failed; ignoring"),
        }
        self.clear_local_state();
    }

    /// Release the provider subscription. Later pushes are ignored, including
    /// ones already in flight on another thread when this returns.
    pub fn teardown(&self) {
        self.state.send_if_modified(|_| {
            self.active.store(false, Ordering::SeqCst);
            false
        });
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            debug!("auth subscription released");
        }
    }

    fn clear_local_state(&self) {
        self.state.send_replace(AuthSnapshot::signed_out());
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
