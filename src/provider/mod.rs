//! Auth provider contract and implementations.
//!
//! ARCHITECTURE
//! ============
//! The session manager talks to the hosted auth service only through
//! [`AuthProvider`]. Providers push session transitions to subscribers via
//! [`AuthListeners`]; explicit calls return results but never mutate the
//! caller's state directly.

pub mod gotrue;
mod listeners;

use std::sync::Arc;

use serde_json::{Map, Value};

pub use listeners::{AuthListeners, Subscription};

use crate::error::AuthError;
use crate::types::{AuthData, AuthEvent, Session};

/// Callback invoked on every pushed session transition.
pub type AuthCallback = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

/// Extra sign-up parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignUpOptions {
    /// Where the confirmation link returns the user.
    pub email_redirect_to: Option<String>,
    /// Profile metadata stored on the new user.
    pub data: Map<String, Value>,
}

/// Email/password auth service with pushed session events.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData, AuthError>;

    async fn sign_up(&self, email: &str, password: &str, options: &SignUpOptions) -> Result<AuthData, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Current session, if one is held.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Register `callback` for session transitions until the returned
    /// subscription is released.
    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription;
}
