//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → circuit_breaker.rs (admit or fail fast)
//!     → retries.rs (repeat with backoff.rs delays until success or bound)
//!     → timeouts.rs (deadline for each individual attempt)
//! ```
//!
//! # Design Decisions
//! - The breaker wraps the retry loop, so transient errors are absorbed
//!   before they count against the failure budget
//! - Timeouts are per attempt; every external call has a deadline
//! - All pieces are plain async combinators composed by the orchestrator

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, BreakerState, CircuitBreaker, CircuitState};
pub use retries::{RetryError, RetryExecutor};
