//! GoTrue REST client (the auth API behind Supabase).
//!
//! Thin HTTP wrapper for `/auth/v1/{token,signup,logout}`. The current
//! session is persisted in the key-value store under
//! `{prefix}{project_ref}-auth-token`, so it survives restarts and is swept
//! by a namespace reset. Pure parsing lives in free functions for
//! testability.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{AuthCallback, AuthListeners, AuthProvider, SignUpOptions, Subscription};
use crate::config::{RemoteConfig, RequestTimeouts};
use crate::error::AuthError;
use crate::store::KeyValueStore;
use crate::types::{AuthData, AuthEvent, Session, User};

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    storage_key: String,
    store: Arc<dyn KeyValueStore>,
    listeners: AuthListeners,
}

impl GoTrueClient {
    /// Build a client for `remote`, persisting sessions in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no host or the HTTP client fails to build.
    pub fn new(
        remote: &RemoteConfig,
        storage_prefix: &str,
        timeouts: RequestTimeouts,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AuthError> {
        let project_ref = project_ref(&remote.url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: remote.url.trim_end_matches('/').to_owned(),
            api_key: remote.api_key.clone(),
            storage_key: storage_key(storage_prefix, &project_ref),
            store,
            listeners: AuthListeners::new(),
        })
    }

    /// Storage key holding the persisted session.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<String, AuthError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/{path}", self.base_url))
            .query(query)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(&self.api_key))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(parse_error_body(status, &text));
        }
        Ok(text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let text = self
            .post(
                "token",
                &[("grant_type", "refresh_token")],
                None,
                &json!({ "refresh_token": refresh_token }),
            )
            .await?;
        parse_session(&text, now_unix())
    }

    fn load_session(&self) -> Option<Session> {
        let raw = match self.store.get_item(&self.storage_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %self.storage_key, "failed to read stored session");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                // EDGE: corrupted blob would otherwise fail every startup.
                warn!(error = %e, key = %self.storage_key, "discarding unreadable stored session");
                self.forget_session();
                None
            }
        }
    }

    fn save_session(&self, session: &Session) {
        let encoded = match serde_json::to_string(session) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode session");
                return;
            }
        };
        if let Err(e) = self.store.set_item(&self.storage_key, &encoded) {
            warn!(error = %e, key = %self.storage_key, "failed to persist session");
        }
    }

    fn forget_session(&self) {
        if let Err(e) = self.store.remove_item(&self.storage_key) {
            warn!(error = %e, key = %self.storage_key, "failed to remove stored session");
        }
    }

    fn adopt_session(&self, session: &Session, event: AuthEvent) {
        self.save_session(session);
        self.listeners.emit(event, Some(session));
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        let text = self
            .post(
                "token",
                &[("grant_type", "password")],
                None,
                &json!({ "email": email, "password": password }),
            )
            .await?;
        let session = parse_session(&text, now_unix())?;
        info!(user_id = %session.user.id, "signed in");
        self.adopt_session(&session, AuthEvent::SignedIn);
        Ok(AuthData::from_session(session))
    }

    async fn sign_up(&self, email: &str, password: &str, options: &SignUpOptions) -> Result<AuthData, AuthError> {
        let mut query = Vec::new();
        if let Some(redirect) = options.email_redirect_to.as_deref() {
            query.push(("redirect_to", redirect));
        }
        let text = self
            .post(
                "signup",
                &query,
                None,
                &json!({ "email": email, "password": password, "data": options.data }),
            )
            .await?;
        let data = parse_sign_up(&text, now_unix())?;
        match &data.session {
            Some(session) => {
                info!(user_id = %session.user.id, "signed up with immediate session");
                self.adopt_session(session, AuthEvent::SignedIn);
            }
            None => info!("signed up; confirmation pending"),
        }
        Ok(data)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.load_session() {
            Some(session) => self
                .post("logout", &[("scope", "global")], Some(&session.access_token), &json!({}))
                .await
                .map(|_| ())
                .or_else(|e| match e.status() {
                    // Token already revoked or expired server-side: nothing left to end.
                    Some(401 | 403 | 404) => Ok(()),
                    _ => Err(e),
                }),
            None => Ok(()),
        };
        self.forget_session();
        self.listeners.emit(AuthEvent::SignedOut, None);
        result
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.load_session() else {
            return Ok(None);
        };
        if !session.is_expired_at(now_unix(), EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            debug!("stored session expired without refresh token");
            self.forget_session();
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(fresh) => {
                debug!(user_id = %fresh.user.id, "refreshed stored session");
                self.adopt_session(&fresh, AuthEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            // Keep the stored session so a later call can retry the refresh.
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                warn!(error = %e, "session refresh rejected; dropping stored session");
                self.forget_session();
                self.listeners.emit(AuthEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn transport_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Transport(format!("timeout: {e}"))
    } else if e.is_connect() {
        AuthError::Transport(format!("connection failed: {e}"))
    } else {
        AuthError::Transport(e.to_string())
    }
}

/// First host label of the provider URL (`abcd` for `https://abcd.supabase.co`).
pub(crate) fn project_ref(url: &str) -> Result<String, AuthError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| AuthError::Config(format!("invalid provider url: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AuthError::Config("provider url has no host".into()))?;
    Ok(host.split('.').next().unwrap_or(host).to_owned())
}

pub(crate) fn storage_key(prefix: &str, project_ref: &str) -> String {
    format!("{prefix}{project_ref}-auth-token")
}

/// Map a non-2xx response to a provider error.
///
/// GoTrue has used several error shapes over time; the first present of
/// `msg`, `error_description`, `message`, `error` wins.
pub(crate) fn parse_error_body(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|field| v.get(field).and_then(Value::as_str).map(str::to_owned))
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        })
        .unwrap_or_else(|| format!("HTTP {status}"));
    AuthError::provider(Some(status), message)
}

pub(crate) fn parse_session(body: &str, issued_at: i64) -> Result<Session, AuthError> {
    let session: Session = serde_json::from_str(body).map_err(|e| AuthError::Decode(e.to_string()))?;
    Ok(session.with_expiry_from(issued_at))
}

/// Sign-up answers with a session when auto-confirm is on, otherwise with
/// the bare user awaiting confirmation.
pub(crate) fn parse_sign_up(body: &str, issued_at: i64) -> Result<AuthData, AuthError> {
    let value: Value = serde_json::from_str(body).map_err(|e| AuthError::Decode(e.to_string()))?;
    if value.get("access_token").is_some() {
        let session: Session = serde_json::from_value(value).map_err(|e| AuthError::Decode(e.to_string()))?;
        return Ok(AuthData::from_session(session.with_expiry_from(issued_at)));
    }
    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: User = serde_json::from_value(user_value).map_err(|e| AuthError::Decode(e.to_string()))?;
    Ok(AuthData::from_user(user))
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
