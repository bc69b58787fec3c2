//! Identifier and redirect helpers.
//!
//! The hosted provider only understands email/password credentials, so a
//! mobile number is turned into a synthetic address under a fixed domain.

/// Metadata key holding the raw mobile number on sign-up.
pub const MOBILE_METADATA_KEY: &str = "mobile";

/// Build the synthetic email for a mobile-number identifier.
#[must_use]
pub fn synthetic_email(identifier: &str, domain: &str) -> String {
    format!("{}@{}", identifier.trim(), domain.trim().trim_start_matches('@'))
}

/// Join the page origin and the app base path into a redirect URL.
///
/// Confirmation links from the provider land here after sign-up.
#[must_use]
pub fn redirect_target(origin: &str, base_path: &str) -> String {
    let origin = origin.trim().trim_end_matches('/');
    let path = base_path.trim().trim_start_matches('/');
    format!("{origin}/{path}")
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
