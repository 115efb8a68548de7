use crate::config::Config;
use crate::error::SubtransError;
use std::time::Duration;

/// Maximum attempts per batch, first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait after an HTTP 429.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// Wait after any other transient failure.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(1);

/// Bounded retry with a fixed back-off per error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_delay: Duration,
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            error_delay: DEFAULT_ERROR_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Same attempt ceiling, no waiting. Used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            rate_limit_delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rate_limit_delay: Duration::from_millis(config.rate_limit_backoff_ms),
            error_delay: Duration::from_millis(config.error_backoff_ms),
        }
    }

    /// How long to wait before repeating a request that failed with `error`.
    pub fn delay_for(&self, error: &SubtransError) -> Duration {
        if error.is_rate_limited() {
            self.rate_limit_delay
        } else {
            self.error_delay
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
