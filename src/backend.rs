//! Provider-agnostic session backend.
//!
//! ARCHITECTURE
//! ============
//! Callers hold an `Arc<dyn SessionBackend>` and never learn whether the
//! hosted provider or the local registry sits behind it. Both variants
//! expose the same snapshot, watch channel, and four operations with the
//! same result shapes.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::local::LocalSessionManager;
use crate::manager::{SessionManager, SessionSettings};
use crate::provider::gotrue::GoTrueClient;
use crate::store::KeyValueStore;
use crate::types::{AuthData, AuthSnapshot};

#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    /// Current `{ user, session, loading }` state.
    fn snapshot(&self) -> AuthSnapshot;

    /// Receiver notified on every state change.
    fn watch(&self) -> watch::Receiver<AuthSnapshot>;

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError>;

    async fn sign_up(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Best-effort recovery; never fails.
    async fn reset_auth(&self);
}

#[async_trait::async_trait]
impl SessionBackend for SessionManager {
    fn snapshot(&self) -> AuthSnapshot {
        SessionManager::snapshot(self)
    }

    fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        SessionManager::watch(self)
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        SessionManager::sign_in(self, identifier, password).await
    }

    async fn sign_up(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        SessionManager::sign_up(self, identifier, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        SessionManager::sign_out(self).await
    }

    async fn reset_auth(&self) {
        SessionManager::reset_auth(self).await;
    }
}

#[async_trait::async_trait]
impl SessionBackend for LocalSessionManager {
    fn snapshot(&self) -> AuthSnapshot {
        LocalSessionManager::snapshot(self)
    }

    fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        LocalSessionManager::watch(self)
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        LocalSessionManager::sign_in(self, identifier, password)
    }

    async fn sign_up(&self, identifier: &str, password: &str) -> Result<AuthData, AuthError> {
        LocalSessionManager::sign_up(self, identifier, password)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        LocalSessionManager::sign_out(self)
    }

    async fn reset_auth(&self) {
        LocalSessionManager::reset_auth(self);
    }
}

/// Build the backend selected by `config`.
///
/// The hosted provider is used when `config.remote` is set; otherwise the
/// local registry fallback. The returned backend has finished its initial
/// session resolution.
///
/// # Errors
///
/// Returns an error if the hosted provider client cannot be built.
pub async fn backend_from_config(
    config: &AuthConfig,
    store: Arc<dyn KeyValueStore>,
) -> Result<Arc<dyn SessionBackend>, AuthError> {
    match &config.remote {
        Some(remote) => {
            let client = GoTrueClient::new(remote, &config.storage_prefix, config.timeouts, Arc::clone(&store))?;
            info!(url = %remote.url, "using hosted auth provider");
            let manager = SessionManager::start(Arc::new(client), store, SessionSettings::from_config(config)).await;
            Ok(Arc::new(manager))
        }
        None => {
            info!("no hosted auth provider configured; using local fallback");
            Ok(Arc::new(LocalSessionManager::new(store, &config.email_domain)))
        }
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
