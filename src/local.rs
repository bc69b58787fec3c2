//! Local fallback backend: a persisted user registry, no network.
//!
//! DESIGN
//! ======
//! Same operation contract as [`crate::manager::SessionManager`] so callers
//! can swap backends. The registry lives in the key-value store; the current
//! session is explicit per-instance state that starts empty and is cleared
//! on sign-out. There are no transient failures here, so nothing retries.
//!
//! Passwords are accepted and ignored. This backend exists for development
//! without a hosted provider, not for protecting anything.

use std::fmt::Write;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::identity::{MOBILE_METADATA_KEY, synthetic_email};
use crate::store::KeyValueStore;
use crate::types::{AuthData, AuthSnapshot, Session, User};

/// Store key holding the JSON array of registered users.
pub const REGISTRY_KEY: &str = "local_auth_users";

/// Registry record for one locally registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub mobile: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl LocalUser {
    fn to_user(&self, email_domain: &str) -> User {
        let mut metadata = Map::new();
        metadata.insert(MOBILE_METADATA_KEY.to_owned(), Value::String(self.mobile.clone()));
        User {
            id: self.id.to_string(),
            email: Some(synthetic_email(&self.mobile, email_domain)),
            user_metadata: metadata,
            created_at: Some(self.created_at.clone()),
        }
    }
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Random 32-byte hex token standing in for a provider access token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub struct LocalSessionManager {
    store: Arc<dyn KeyValueStore>,
    email_domain: String,
    state: watch::Sender<AuthSnapshot>,
}

impl LocalSessionManager {
    /// Create a manager with no current session.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, email_domain: &str) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::signed_out());
        Self { store, email_domain: email_domain.to_owned(), state }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// All registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or decoded.
    pub fn users(&self) -> Result<Vec<LocalUser>, AuthError> {
        let Some(raw) = self.store.get_item(REGISTRY_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| AuthError::Decode(format!("local user registry: {e}")))
    }

    fn save_users(&self, users: &[LocalUser]) -> Result<(), AuthError> {
        let encoded = serde_json::to_string(users).map_err(|e| AuthError::Decode(e.to_string()))?;
        self.store.set_item(REGISTRY_KEY, &encoded)?;
        Ok(())
    }

    /// Make `record` the current session.
    fn activate(&self, record: &LocalUser) -> AuthData {
        let session = Session {
            access_token: generate_token(),
            refresh_token: None,
            token_type: "bearer".to_owned(),
            expires_in: None,
            expires_at: None,
            user: record.to_user(&self.email_domain),
        };
        self.state.send_replace(AuthSnapshot::resolved(Some(session.clone())));
        AuthData::from_session(session)
    }

    /// Sign in a registered mobile number.
    ///
    /// # Errors
    ///
    /// [`AuthError::UserNotFound`] when no record matches.
    pub fn sign_in(&self, identifier: &str, _password: &str) -> Result<AuthData, AuthError> {
        let mobile = identifier.trim();
        let users = self.users()?;
        let record = users
            .iter()
            .find(|u| u.mobile == mobile)
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %record.id, "local sign-in");
        Ok(self.activate(record))
    }

    /// Register a new mobile number and sign it in.
    ///
    /// # Errors
    ///
    /// [`AuthError::UserAlreadyExists`] when the number is taken.
    pub fn sign_up(&self, identifier: &str, _password: &str) -> Result<AuthData, AuthError> {
        let mobile = identifier.trim();
        let mut users = self.users()?;
        if users.iter().any(|u| u.mobile == mobile) {
            return Err(AuthError::UserAlreadyExists);
        }
        let record = LocalUser { id: Uuid::new_v4(), mobile: mobile.to_owned(), created_at: now_rfc3339() };
        users.push(record.clone());
        self.save_users(&users)?;
        info!(user_id = %record.id, "local sign-up");
        Ok(self.activate(&record))
    }

    /// Clear the current session. Always succeeds.
    ///
    /// # Errors
    ///
    /// Never; the `Result` matches the hosted backend's signature.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.state.send_replace(AuthSnapshot::signed_out());
        Ok(())
    }

    /// Clear the current session; the registry is kept.
    pub fn reset_auth(&self) {
        self.state.send_replace(AuthSnapshot::signed_out());
    }
}

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;
