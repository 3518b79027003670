//! Resilient outbound-call gateway library.
//!
//! Forwards inbound requests to a single upstream service behind a shared
//! circuit breaker wrapping a bounded exponential-backoff retry loop.

pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::CallOrchestrator;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
