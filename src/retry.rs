//! Capped exponential backoff with jitter for provider calls.
//!
//! DESIGN
//! ======
//! Each operation invocation runs its own bounded loop with a local attempt
//! counter, so concurrent sign-ins never share retry state. Only transient
//! failures (see [`AuthError::is_transient`]) are retried; everything else
//! returns on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::AuthError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 4000;
pub const DEFAULT_JITTER_MS: u64 = 250;

/// Retry tuning for transient auth failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, jitter included.
    pub max_delay_ms: u64,
    /// Exclusive upper bound of the uniform random jitter.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_ms: DEFAULT_JITTER_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed `attempt` given an explicit jitter value.
    ///
    /// `min(max_delay, base * 2^attempt + jitter)`.
    #[must_use]
    pub fn delay_with_jitter(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(
            exponential
                .saturating_add(jitter_ms)
                .min(self.max_delay_ms),
        )
    }

    /// Delay after a failed `attempt` with fresh random jitter.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..self.jitter_ms)
        };
        self.delay_with_jitter(attempt, jitter)
    }
}

/// Run `op` until it succeeds, fails terminally, or attempts run out.
///
/// `op` receives the zero-based attempt index. On exhaustion the last
/// observed error is returned.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, operation: &'static str, mut op: F) -> Result<T, AuthError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let total = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt, "auth call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt + 1 < total => {
                let delay = policy.backoff_delay(attempt);
                warn!(
                    error = %e,
                    operation,
                    attempt,
                    total,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "transient auth failure; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(error = %e, operation, total, "auth call failed after retries");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
