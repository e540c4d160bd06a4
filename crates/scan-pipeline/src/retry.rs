//! Bounded retry with exponential backoff
//!
//! Used around the LLM call only. Catalog fetches propagate their first
//! failure.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Total attempts (first try included) when nothing is configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay; doubles after each failed attempt (500ms, 1000ms, ...)
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Sleep after the zero-based failed `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `f` until it succeeds or `max_attempts` is exhausted.
///
/// Sleeps `base_delay * 2^attempt` between attempts but never after the
/// last one. Returns the final error on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    "{operation} failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(attempts = max_attempts, "{operation} failed, giving up: {e}");
                return Err(e);
            }
        }
    }
}
