//! Resilient outbound-call gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                      GATEWAY                          │
//!     Client Request      │  ┌────────┐    ┌──────────────┐    ┌───────────────┐ │
//!     ────────────────────┼─▶│  http  │───▶│ orchestrator │───▶│circuit breaker│ │
//!                         │  │ server │    │  (context)   │    └───────┬───────┘ │
//!                         │  └────────┘    └──────────────┘            ▼         │
//!                         │                                    ┌───────────────┐ │
//!                         │                                    │ retry + back- │ │
//!                         │                                    │ off + timeout │ │
//!                         │                                    └───────┬───────┘ │
//!     Client Response     │  ┌────────┐                                ▼         │
//!     ◀───────────────────┼──│envelope│◀───────────────────────── upstream ──────┼──▶ Upstream
//!                         │  └────────┘                                          │    Service
//!                         │  config · health · observability · lifecycle         │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use resilient_gateway::config::load_from_env;
use resilient_gateway::http::HttpServer;
use resilient_gateway::lifecycle::{signals, startup, Shutdown};
use resilient_gateway::observability::{logging, metrics};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("resilient-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    startup::log_config(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (state, upstream) = startup::build_state(&config)?;
    tokio::spawn(async move {
        startup::probe_upstream(upstream.as_ref()).await;
    });

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(&config, state).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
