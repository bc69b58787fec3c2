//! Auth configuration parsed from environment variables.

use std::path::PathBuf;

use crate::identity::redirect_target;
use crate::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_JITTER_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS, RetryPolicy};

pub const DEFAULT_EMAIL_DOMAIN: &str = "phone.local";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_APP_BASE_PATH: &str = "/";
pub const DEFAULT_STORAGE_PREFIX: &str = "sb-";
pub const DEFAULT_STORE_PATH: &str = ".authsession.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid AUTH_URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("AUTH_URL is set but {var} is missing")]
    MissingApiKey { var: &'static str },
}

/// Hosted provider endpoint and its public API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// `None` selects the local fallback backend.
    pub remote: Option<RemoteConfig>,
    pub email_domain: String,
    pub app_origin: String,
    pub app_base_path: String,
    /// Namespace prefix of provider-owned storage keys.
    pub storage_prefix: String,
    pub store_path: PathBuf,
    pub timeouts: RequestTimeouts,
    pub retry: RetryPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            remote: None,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_owned(),
            app_origin: DEFAULT_APP_ORIGIN.to_owned(),
            app_base_path: DEFAULT_APP_BASE_PATH.to_owned(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_owned(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            timeouts: RequestTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AuthConfig {
    /// Build typed auth config from environment variables.
    ///
    /// Remote provider (both or neither):
    /// - `AUTH_URL`: provider base URL, e.g. `https://abcd.supabase.co`
    /// - `AUTH_ANON_KEY`: public API key
    ///
    /// Optional:
    /// - `AUTH_EMAIL_DOMAIN`: synthetic email domain (default `phone.local`)
    /// - `APP_ORIGIN`, `APP_BASE_PATH`: sign-up redirect target
    /// - `AUTH_STORAGE_PREFIX`: provider key namespace (default `sb-`)
    /// - `AUTH_STORE_PATH`: file store location for the CLI
    /// - `AUTH_REQUEST_TIMEOUT_SECS`, `AUTH_CONNECT_TIMEOUT_SECS`
    /// - `AUTH_RETRY_MAX_ATTEMPTS`, `AUTH_RETRY_BASE_MS`,
    ///   `AUTH_RETRY_MAX_DELAY_MS`, `AUTH_RETRY_JITTER_MS`
    ///
    /// # Errors
    ///
    /// Returns an error if `AUTH_URL` is not an http(s) URL or is set without
    /// `AUTH_ANON_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote = match env_non_empty("AUTH_URL") {
            Some(url) => {
                let api_key = env_non_empty("AUTH_ANON_KEY").ok_or(ConfigError::MissingApiKey { var: "AUTH_ANON_KEY" })?;
                Some(RemoteConfig { url: parse_base_url(&url)?, api_key })
            }
            None => None,
        };

        let timeouts = RequestTimeouts {
            request_secs: env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let retry = RetryPolicy {
            max_attempts: env_parse("AUTH_RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            base_delay_ms: env_parse("AUTH_RETRY_BASE_MS", DEFAULT_BASE_DELAY_MS),
            max_delay_ms: env_parse("AUTH_RETRY_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS),
            jitter_ms: env_parse("AUTH_RETRY_JITTER_MS", DEFAULT_JITTER_MS),
        };

        Ok(Self {
            remote,
            email_domain: env_non_empty("AUTH_EMAIL_DOMAIN").unwrap_or_else(|| DEFAULT_EMAIL_DOMAIN.to_owned()),
            app_origin: env_non_empty("APP_ORIGIN").unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_owned()),
            app_base_path: env_non_empty("APP_BASE_PATH").unwrap_or_else(|| DEFAULT_APP_BASE_PATH.to_owned()),
            storage_prefix: env_non_empty("AUTH_STORAGE_PREFIX").unwrap_or_else(|| DEFAULT_STORAGE_PREFIX.to_owned()),
            store_path: env_non_empty("AUTH_STORE_PATH").map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from),
            timeouts,
            retry,
        })
    }

    /// Where sign-up confirmation links should send the user back to.
    #[must_use]
    pub fn email_redirect_to(&self) -> String {
        redirect_target(&self.app_origin, &self.app_base_path)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = reqwest::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl { url: raw.to_owned(), reason: e.to_string() })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl { url: raw.to_owned(), reason: "expected an http(s) URL with a host".into() });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
