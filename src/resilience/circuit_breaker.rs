//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: testing if upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold within window
//! Open → Half-Open: first call after the cooldown
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails
//! ```
//!
//! # Design Decisions
//! - One shared breaker per upstream, owned by the orchestrator
//! - Fail fast in Open state (the wrapped work is never invoked)
//! - Single probe in Half-Open (prevents hammering recovering upstream)
//! - The breaker only sees the aggregate outcome of the wrapped work

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker admission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone)]
pub struct BreakerState {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_transition: Instant,
    pub last_failure: Option<Instant>,
    /// First failure of the current streak.
    pub window_start: Option<Instant>,
}

/// Failure of a call made through the breaker.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// Admission refused; the work was not run.
    #[error("circuit breaker is open")]
    Open,
    /// The work ran and failed.
    #[error(transparent)]
    Inner(E),
}

struct Inner {
    snapshot: BreakerState,
    trial_in_flight: bool,
}

/// Three-state admission gate.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    sampling_window: Duration,
    half_open_after: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot: BreakerState {
                    state: CircuitState::Closed,
                    consecutive_failures: 0,
                    last_transition: Instant::now(),
                    last_failure: None,
                    window_start: None,
                },
                trial_in_flight: false,
            }),
            failure_threshold: config.failure_threshold.max(1),
            sampling_window: config.sampling_window(),
            half_open_after: config.half_open_after(),
        }
    }

    /// Current state. An expired Open state is reported as Open until a
    /// call arrives to move it to Half-Open.
    pub fn state(&self) -> CircuitState {
        self.lock().snapshot.state
    }

    pub fn snapshot(&self) -> BreakerState {
        self.lock().snapshot.clone()
    }

    /// Run `work` if the breaker admits it, recording its outcome.
    pub async fn execute<T, E, F, Fut>(&self, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().ok_or(BreakerError::Open)?;

        let result = work().await;
        match &result {
            Ok(_) => permit.record_success(),
            Err(_) => permit.record_failure(),
        }
        result.map_err(BreakerError::Inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();
        let now = Instant::now();

        let trial = match inner.snapshot.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                if now.duration_since(inner.snapshot.last_transition) < self.half_open_after {
                    return None;
                }
                transition(&mut inner.snapshot, CircuitState::HalfOpen, now);
                true
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return None;
                }
                true
            }
        };

        if trial {
            inner.trial_in_flight = true;
        }
        Some(Permit { breaker: self, trial, settled: false })
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
            if inner.snapshot.state == CircuitState::HalfOpen {
                inner.snapshot.consecutive_failures = 0;
                inner.snapshot.window_start = None;
                transition(&mut inner.snapshot, CircuitState::Closed, Instant::now());
            }
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        let now = Instant::now();
        let snapshot = &mut inner.snapshot;

        match snapshot.state {
            CircuitState::HalfOpen if trial => {
                transition(snapshot, CircuitState::Open, now);
            }
            CircuitState::Closed => {
                // The whole streak must fit in the window.
                let expired = snapshot
                    .window_start
                    .map_or(true, |start| now.duration_since(start) > self.sampling_window);
                if expired {
                    snapshot.consecutive_failures = 0;
                    snapshot.window_start = Some(now);
                }
                snapshot.consecutive_failures += 1;
                if snapshot.consecutive_failures >= self.failure_threshold {
                    transition(snapshot, CircuitState::Open, now);
                }
            }
            _ => {}
        }
        snapshot.last_failure = Some(now);

        if trial {
            inner.trial_in_flight = false;
        }
    }

    /// A trial that never reported back frees the Half-Open slot.
    fn on_abandoned(&self, trial: bool) {
        if trial {
            self.lock().trial_in_flight = false;
        }
    }
}

fn transition(snapshot: &mut BreakerState, to: CircuitState, now: Instant) {
    let from = snapshot.state;
    snapshot.state = to;
    snapshot.last_transition = now;

    match to {
        CircuitState::Open => tracing::warn!(
            from = %from,
            failures = snapshot.consecutive_failures,
            "Circuit breaker opened"
        ),
        _ => tracing::info!(from = %from, to = %to, "Circuit breaker transition"),
    }
    metrics::record_breaker_transition(to.as_str());
}

/// Admission granted by the breaker; reports the outcome exactly once.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Permit<'_> {
    fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.trial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(&CircuitBreakerConfig::default())
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.execute(|| async { Err("upstream down") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.execute(|| async { Ok(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let cb = breaker();
        for _ in 0..4 {
            assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(_))));
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(_))));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().consecutive_failures, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_running_work() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }

        let calls = AtomicU32::new(0);
        let result: Result<(), BreakerError<&str>> = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(29_999)).await;
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(succeed(&cb).await.is_ok());
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_restarts_cooldown() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(_))));
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(succeed(&cb).await.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_trial() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = cb.execute(|| async move {
            let _ = release_rx.await;
            Ok::<_, &str>("probe")
        });
        let second = async {
            tokio::task::yield_now().await;
            let result = succeed(&cb).await;
            let _ = release_tx.send(());
            result
        };

        let (trial_result, second_result) = tokio::join!(trial, second);
        assert_eq!(trial_result.unwrap(), "probe");
        assert!(matches!(second_result, Err(BreakerError::Open)));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failures_start_new_streak() {
        let cb = breaker();
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_millis(10_001)).await;

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_spread_beyond_window_stay_closed() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
            tokio::time::advance(Duration::from_secs(9)).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        // Failures at 0s and 9s form one streak; 18s starts the next.
        assert_eq!(cb.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_frees_half_open_slot() {
        let cb = breaker();
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        let abandoned = cb.execute(|| std::future::pending::<Result<(), &str>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), abandoned).await;
        assert!(timed_out.is_err());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let calls = AtomicU32::new(0);
        let result: Result<(), BreakerError<&str>> = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_success_keeps_count() {
        let cb = breaker();
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert!(succeed(&cb).await.is_ok());
        assert_eq!(cb.snapshot().consecutive_failures, 2);
    }
}
