//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file (GATEWAY_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PORT, API_KEY, FASTAPI_URL, ...)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - A missing API key is a per-request error, not a startup error

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, ConfigError};
pub use schema::{
    CircuitBreakerConfig, GatewayConfig, HealthConfig, ListenerConfig, ObservabilityConfig,
    RetryConfig, UpstreamConfig,
};
