//! Startup orchestration.
//!
//! Subsystems are built in dependency order: upstream client, then the
//! shared breaker and orchestrator, then health. Listeners start last.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::health::ProcessMemoryProbe;
use crate::http::AppState;
use crate::upstream::{HttpUpstream, Upstream, UpstreamError};

/// Build the application state for a validated configuration.
///
/// Returns the upstream client alongside so the caller can probe it.
pub fn build_state(config: &GatewayConfig) -> Result<(AppState, Arc<HttpUpstream>), UpstreamError> {
    let upstream = Arc::new(HttpUpstream::new(&config.upstream)?);
    let state = AppState::new(config, upstream.clone(), Arc::new(ProcessMemoryProbe::new()));
    Ok((state, upstream))
}

/// Log reachability of the upstream. Never fatal.
pub async fn probe_upstream(upstream: &dyn Upstream) {
    match upstream.ping().await {
        Ok(status) => tracing::info!(status = %status, "Upstream reachable"),
        Err(e) => tracing::warn!(error = %e, "Upstream ping failed; serving anyway"),
    }
}

/// Log the effective configuration without secrets.
pub fn log_config(config: &GatewayConfig) {
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = %config.upstream.base_url,
        api_key_configured = config.upstream.api_key.is_some(),
        max_attempts = config.retries.max_attempts,
        failure_threshold = config.circuit_breaker.failure_threshold,
        half_open_after_ms = config.circuit_breaker.half_open_after_ms,
        environment = %config.observability.environment,
        jaeger_endpoint = %config.observability.jaeger_endpoint,
        "Configuration loaded"
    );
    if config.upstream.api_key.is_none() {
        tracing::warn!("API_KEY is not set; upstream calls will be refused");
    }
}
