//! Retry with exponential backoff for idempotent remote reads.
//!
//! Only errors for which [`crate::error::PlatformError::is_retryable`] holds are retried;
//! anything else returns immediately.

use std::future::Future;
use std::time::Duration;

use tb_config::RetrySettings;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_delay: Duration,
    /// Cap for the exponential delay
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// delay = initial_delay * multiplier^attempt, capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            multiplier: settings.multiplier,
        }
    }
}

/// Run `operation`, retrying retryable failures with backoff.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once `max_retries` is exhausted.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(operation = label, attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= policy.max_retries {
                    warn!(operation = label, attempts = attempt + 1, error = %err, "Giving up after retries");
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retryable failure, backing off"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
