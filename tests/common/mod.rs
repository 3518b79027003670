//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use resilient_gateway::config::GatewayConfig;
use resilient_gateway::health::{MemoryProbe, StaticMemoryProbe};
use resilient_gateway::http::{AppState, HttpServer};
use resilient_gateway::lifecycle::Shutdown;
use resilient_gateway::upstream::{CompletionResponse, Upstream, UpstreamError, Usage};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const MB: u64 = 1024 * 1024;

pub fn sample_completion(text: &str) -> CompletionResponse {
    CompletionResponse {
        completion: text.to_string(),
        usage: Usage { prompt_tokens: 3, completion_tokens: 5, total_tokens: 8 },
        model: "mock-model".to_string(),
        timestamp: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// In-process upstream whose behavior tests can script.
pub struct ScriptedUpstream {
    fail_first: u32,
    healthy: AtomicBool,
    calls: AtomicU32,
    bodies: Mutex<Vec<Value>>,
}

impl ScriptedUpstream {
    /// Fails the first `n` calls, then succeeds.
    pub fn flaky(n: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_first: n,
            healthy: AtomicBool::new(true),
            calls: AtomicU32::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::flaky(0)
    }

    pub fn down() -> Arc<Self> {
        let upstream = Self::flaky(0);
        upstream.set_healthy(false);
        upstream
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.bodies.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn call_completions(&self, body: &Value, _api_key: &str) -> Result<CompletionResponse, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
        if n < self.fail_first || !self.healthy.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status { status: 503, body: "upstream unavailable".into() });
        }
        Ok(sample_completion("hello from upstream"))
    }

    async fn ping(&self) -> Result<Value, UpstreamError> {
        Ok(serde_json::json!({ "status": "ok" }))
    }
}

/// Defaults with short backoff so failure paths run quickly.
pub fn fast_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.upstream.api_key = Some("test-key".into());
    config.retries.initial_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config
}

/// Start the gateway on an ephemeral port.
pub async fn spawn_gateway(
    config: GatewayConfig,
    upstream: Arc<dyn Upstream>,
    probe: Arc<dyn MemoryProbe>,
) -> (SocketAddr, Shutdown) {
    let state = AppState::new(&config, upstream, probe);
    let server = HttpServer::new(&config, state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub async fn spawn_default_gateway(config: GatewayConfig, upstream: Arc<dyn Upstream>) -> (SocketAddr, Shutdown) {
    spawn_gateway(config, upstream, Arc::new(StaticMemoryProbe(64 * MB))).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a programmable HTTP backend. `f` receives the raw request head and
/// returns a status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 4096];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&buf).to_string();

                        let (status, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
