//! Session, user, and event types shared by every backend.
//!
//! Field names follow the GoTrue wire format so provider responses and
//! persisted sessions deserialize directly into these types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::MOBILE_METADATA_KEY;

// =============================================================================
// USER / SESSION
// =============================================================================

/// Identity record attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Profile metadata; sign-up stores the raw mobile number here.
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    /// Raw mobile number recorded at sign-up, if any.
    #[must_use]
    pub fn mobile(&self) -> Option<&str> {
        self.user_metadata
            .get(MOBILE_METADATA_KEY)
            .and_then(Value::as_str)
    }
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Provider-issued proof of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds at issue time.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry as unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Whether the session is expired at `now` (unix seconds), treating the
    /// last `margin_secs` before expiry as already expired.
    ///
    /// Sessions without an expiry never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp.saturating_sub(margin_secs) <= now)
    }

    /// Fill `expires_at` from `expires_in` when the provider omitted it.
    #[must_use]
    pub fn with_expiry_from(mut self, issued_at: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| issued_at.saturating_add(secs));
        }
        self
    }
}

// =============================================================================
// EVENTS / RESULTS
// =============================================================================

/// Session transitions pushed by a provider to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Successful payload of sign-in and sign-up.
///
/// Sign-up with email confirmation pending yields a user without a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl AuthData {
    #[must_use]
    pub fn from_session(session: Session) -> Self {
        Self { user: Some(session.user.clone()), session: Some(session) }
    }

    #[must_use]
    pub fn from_user(user: User) -> Self {
        Self { user: Some(user), session: None }
    }
}

/// Reactive view of the current auth state.
///
/// `user` is always the user of `session`; both are replaced together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    /// True until the first session resolution completes.
    pub loading: bool,
}

impl AuthSnapshot {
    /// Initial state before the current session is known.
    #[must_use]
    pub fn pending() -> Self {
        Self { user: None, session: None, loading: true }
    }

    /// Resolved state with no authenticated user.
    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, session: None, loading: false }
    }

    /// Resolved state for `session`, replacing any previous pair.
    #[must_use]
    pub fn resolved(session: Option<Session>) -> Self {
        Self { user: session.as_ref().map(|s| s.user.clone()), session, loading: false }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::pending()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
