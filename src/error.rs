//! Gateway error taxonomy.
//!
//! Every failure a request can hit is one of four kinds. The HTTP layer is
//! the only place these are turned into status codes and response bodies.

use axum::http::StatusCode;

use crate::upstream::UpstreamError;

/// Closed set of failures surfaced by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required secret (the upstream API key) is not configured.
    #[error("service not configured: {0}")]
    Configuration(String),

    /// The inbound request is malformed or misses a required field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The upstream kept failing until the retry bound was reached.
    #[error("upstream failed after {attempts} attempts: {source}")]
    Upstream {
        attempts: u32,
        #[source]
        source: UpstreamError,
    },

    /// The circuit breaker refused admission.
    #[error("circuit breaker is open")]
    BreakerOpen,
}

impl GatewayError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::BreakerOpen => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-facing message. Never includes upstream payloads.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Configuration(_) => "Service not configured".to_string(),
            GatewayError::Validation(msg) => msg.clone(),
            GatewayError::Upstream { .. } => "Internal server error".to_string(),
            GatewayError::BreakerOpen => "Service temporarily unavailable".to_string(),
        }
    }

    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Validation(_) => "validation",
            GatewayError::Upstream { .. } => "upstream",
            GatewayError::BreakerOpen => "breaker_open",
        }
    }
}
