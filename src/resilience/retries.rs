//! Retry logic.
//!
//! # Responsibilities
//! - Run a unit of work up to `max_attempts` times
//! - Wait out an exponential backoff between attempts
//! - Hand the attempt number to the work so callers can record it
//!
//! # Design Decisions
//! - Every failure is retried; the policy does not classify errors
//! - No jitter: the schedule is deterministic
//! - Timing and logging of individual attempts belong to the caller

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

/// Last failure of an exhausted retry sequence, tagged with the attempt count.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: {source}")]
pub struct RetryError<E> {
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Bounded exponential-backoff retry executor.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryExecutor {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::from_config(config),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `work` until it succeeds or the attempt bound is reached.
    ///
    /// `work` receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, mut work: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let delay = self.backoff.delay_before(attempt);
            if !delay.is_zero() {
                tracing::debug!(attempt, delay = ?delay, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match work(attempt).await {
                Ok(value) => return Ok(value),
                Err(source) if attempt >= self.max_attempts => {
                    return Err(RetryError { attempts: attempt, source });
                }
                Err(_) => attempt += 1,
            }
        }
    }
}
