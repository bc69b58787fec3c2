//! Auth error taxonomy and transient-failure classification.
//!
//! DESIGN
//! ======
//! Provider failures carry an optional HTTP status plus a message. Retry
//! decisions look at both: overload statuses are always transient, and
//! network-sounding messages are too, since the provider does not always
//! attach a status. Transport failures are always transient. Local errors
//! (storage, config, registry) never are, whatever their text says.
//!
//! ERROR HANDLING
//! ==============
//! Operations return these as values. Nothing in the session layer panics
//! or unwinds on a failed auth call; callers decide how to render them.

use crate::store::StoreError;

/// HTTP statuses that indicate an overloaded or restarting backend.
pub const TRANSIENT_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Lowercased message fragments that indicate a network-level failure.
pub const TRANSIENT_MESSAGE_PATTERNS: [&str; 5] =
    ["service unavailable", "network", "fetch failed", "econnreset", "timeout"];

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider answered with an error body.
    #[error("{message}")]
    Provider { status: Option<u16>, message: String },

    /// The request never produced a response.
    #[error("network request failed: {0}")]
    Transport(String),

    /// The provider answered but the body was not understood.
    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("auth client config error: {0}")]
    Config(String),
}

impl AuthError {
    /// Build a provider error from an optional status and message.
    #[must_use]
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider { status, message: message.into() }
    }

    /// HTTP-like status attached to the failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether retrying the same call is likely to succeed.
    ///
    /// Only provider answers and transport failures qualify; local storage,
    /// config, and registry errors never do.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { status, message } => is_transient_error(*status, message),
            Self::Transport(_) => true,
            Self::Decode(_) | Self::UserNotFound | Self::UserAlreadyExists | Self::Store(_) | Self::Config(_) => false,
        }
    }
}

/// Classify a failure by status code or message text.
///
/// Transient when the status is one of [`TRANSIENT_STATUSES`] or the message
/// contains any of [`TRANSIENT_MESSAGE_PATTERNS`], ignoring case.
#[must_use]
pub fn is_transient_error(status: Option<u16>, message: &str) -> bool {
    if status.is_some_and(|s| TRANSIENT_STATUSES.contains(&s)) {
        return true;
    }
    let lowered = message.to_ascii_lowercase();
    TRANSIENT_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
