//! Exponential backoff schedule.

use std::time::Duration;

use crate::config::RetryConfig;

/// Delay to wait before running `attempt` (1-based).
///
/// Attempt 1 runs immediately. Attempt `n >= 2` waits
/// `min(initial * factor^(n-2), max)`.
pub fn calculate_backoff(attempt: u32, initial_ms: u64, factor: u32, max_ms: u64) -> Duration {
    if attempt <= 1 {
        return Duration::from_millis(0);
    }

    let growth = u64::from(factor).saturating_pow(attempt - 2);
    let delay_ms = initial_ms.saturating_mul(growth);

    Duration::from_millis(delay_ms.min(max_ms))
}

/// Backoff schedule bound to a retry configuration.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: u64,
    factor: u32,
    max_ms: u64,
}

impl Backoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_ms: config.initial_delay_ms,
            factor: config.factor,
            max_ms: config.max_delay_ms,
        }
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.initial_ms, self.factor, self.max_ms)
    }
}
