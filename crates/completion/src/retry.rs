//! Retry logic with exponential backoff.
//!
//! A call is attempted up to `max_attempts` times. The delay after failed
//! attempt `n` (1-based) is `base_delay * 2^(n-1)`, capped at `max_delay`, or
//! at `timeout_max_delay` when the failure was a timeout.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::duration_millis;
use crate::error::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds.
    #[serde(with = "duration_millis", default = "default_base_delay")]
    pub base_delay: Duration,

    /// Cap for ordinary failures, in milliseconds.
    #[serde(with = "duration_millis", default = "default_max_delay")]
    pub max_delay: Duration,

    /// Cap for timeout failures, in milliseconds.
    #[serde(with = "duration_millis", default = "default_timeout_max_delay")]
    pub timeout_max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            timeout_max_delay: default_timeout_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set both delay caps.
    #[must_use]
    pub const fn with_caps(mut self, ordinary: Duration, timeout: Duration) -> Self {
        self.max_delay = ordinary;
        self.timeout_max_delay = timeout;
        self
    }

    /// Single attempt, no waiting.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Millisecond-scale delays for tests and local services.
    #[must_use]
    pub const fn quick() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            timeout_max_delay: Duration::from_millis(20),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, error: &Error) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let cap = if error.is_timeout() {
            self.timeout_max_delay
        } else {
            self.max_delay
        };
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(cap, |delay| delay.min(cap))
    }

    /// Validate the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the attempt budget is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config_error("retry max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Run `operation` under `policy`.
///
/// The closure receives the 1-based attempt number. Non-retryable errors are
/// returned immediately; once the budget is spent the last error is wrapped
/// in [`Error::RetriesExhausted`].
///
/// # Errors
///
/// Returns the first non-retryable error, or [`Error::RetriesExhausted`].
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %e,
                    "Retry budget exhausted"
                );
                return Err(Error::retries_exhausted(attempt, e));
            }
            Err(e) => {
                let delay = policy.delay_for(attempt, &e);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

const fn default_timeout_max_delay() -> Duration {
    Duration::from_secs(20)
}
