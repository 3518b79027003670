//! Request orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → orchestrator.rs (resolve request id, open span)
//!     → CircuitBreaker::execute
//!         → RetryExecutor::execute
//!             → Upstream::call_completions (one Attempt per call)
//!     → context.rs (attempts, latency, final status)
//!     → CallOutcome back to the handler
//! ```

pub mod context;
pub mod orchestrator;

pub use context::{Attempt, AttemptOutcome, CallStatus, RequestContext};
pub use orchestrator::{CallOrchestrator, CallOutcome, InboundCall};
