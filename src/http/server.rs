//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, limits, timeouts, request ID)
//! - Serve on a listener until shutdown is signalled

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::PropagateRequestIdLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::CallOrchestrator;
use crate::health::{HealthMonitor, MemoryProbe};
use crate::http::handlers;
use crate::lifecycle::shutdown::wait_for;
use crate::resilience::CircuitBreaker;
use crate::upstream::Upstream;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CallOrchestrator>,
    pub health: Arc<HealthMonitor>,
}

impl AppState {
    /// Wire the core around an upstream and a memory probe.
    ///
    /// One breaker is created here and shared by every request.
    pub fn new(config: &GatewayConfig, upstream: Arc<dyn Upstream>, probe: Arc<dyn MemoryProbe>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(&config.circuit_breaker));
        let orchestrator = Arc::new(CallOrchestrator::new(config, upstream, breaker));
        let health = Arc::new(HealthMonitor::new(
            &config.health,
            config.observability.environment.clone(),
            probe,
        ));
        Self { orchestrator, health }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &GatewayConfig, state: AppState) -> Self {
        Self { router: Self::build_router(config, state) }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/completions", post(handlers::completions))
            .route("/agent/demo", post(handlers::agent_demo))
            .route("/run", post(handlers::run))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
