//! Bounded retry with exponential backoff
//!
//! Wraps any fallible async operation. Attempts 1..N-1 are guarded: a
//! retryable failure is logged, followed by a sleep of the current delay,
//! after which the delay is multiplied by the backoff factor. The Nth
//! attempt is unguarded and its error is returned to the caller as-is.
//! A failure the predicate rejects is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::adapters::errors::ExchangeError;
use crate::config::RetryConfig;

/// Upper bound on a single backoff sleep
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// `secs` as a Duration, clamped to [`MAX_RETRY_DELAY`]. NaN and negative
/// values clamp to the bound as well.
fn clamped_delay(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
}

/// Attempt count, initial delay and backoff multiplier for one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the final unguarded one (>= 1)
    pub max_attempts: u32,
    /// Sleep after the first failed attempt
    pub initial_delay: Duration,
    /// Delay multiplier applied after every sleep
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            backoff: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: clamped_delay(config.initial_delay_secs),
            backoff: config.backoff,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff,
        }
    }

    /// Run `op` under this policy.
    ///
    /// # Arguments
    /// * `label` - Operation name for logging (e.g., "binance.fetch_symbols")
    /// * `is_retryable` - Failures for which this returns false bypass the policy
    /// * `op` - Async closure performing one attempt
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, is_retryable: P, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut remaining = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 1;

        while remaining > 1 {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        operation = label,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "{} failed, retrying",
                        label
                    );
                    tokio::time::sleep(delay).await;
                    remaining -= 1;
                    attempt += 1;
                    delay = clamped_delay(delay.as_secs_f64() * self.backoff);
                }
            }
        }

        op().await
    }

    /// [`RetryPolicy::run`] with [`ExchangeError::is_retryable`] as predicate.
    pub async fn run_default<T, F, Fut>(&self, label: &str, op: F) -> Result<T, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        self.run(label, ExchangeError::is_retryable, op).await
    }
}
