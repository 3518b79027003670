//! Failure injection tests: breaker admission and the real HTTP upstream client.

use reqwest::StatusCode;
use resilient_gateway::health::StaticMemoryProbe;
use resilient_gateway::upstream::HttpUpstream;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;

use common::{client, fast_config, sample_completion, spawn_default_gateway, spawn_gateway, ScriptedUpstream, MB};

async fn post_run(addr: std::net::SocketAddr) -> (StatusCode, Value) {
    let res = client()
        .post(format!("http://{}/run", addr))
        .json(&json!({ "prompt": "x" }))
        .send()
        .await
        .expect("Gateway unreachable");
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_breaker_opens_after_five_failed_calls() {
    let upstream = ScriptedUpstream::down();
    let (addr, shutdown) = spawn_default_gateway(fast_config(), upstream.clone()).await;

    for _ in 0..5 {
        let (status, _) = post_run(addr).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(upstream.calls(), 25);

    let (status, body) = post_run(addr).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Service temporarily unavailable");
    assert!(body["request_id"].is_string());
    assert_eq!(upstream.calls(), 25, "Open breaker must not reach the upstream");

    // The breaker is shared: /completions is refused too.
    let res = client()
        .post(format!("http://{}/completions", addr))
        .json(&json!({ "prompt": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(upstream.calls(), 25);

    shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_recovers_after_cooldown() {
    let mut config = fast_config();
    config.circuit_breaker.half_open_after_ms = 300;
    let upstream = ScriptedUpstream::down();
    let (addr, shutdown) = spawn_default_gateway(config, upstream.clone()).await;

    for _ in 0..5 {
        post_run(addr).await;
    }
    assert_eq!(post_run(addr).await.0, StatusCode::SERVICE_UNAVAILABLE);

    // Failed trial re-opens the breaker and restarts the cooldown.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(post_run(addr).await.0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream.calls(), 30);
    assert_eq!(post_run(addr).await.0, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(upstream.calls(), 30);

    // Successful trial closes it.
    upstream.set_healthy(true);
    tokio::time::sleep(Duration::from_millis(350)).await;
    let (status, body) = post_run(addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attempts"], 1);

    let (status, _) = post_run(addr).await;
    assert_eq!(status, StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_http_upstream_retries_and_sends_api_key() {
    let call_count = Arc::new(AtomicU32::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));

    let cc = call_count.clone();
    let seen = heads.clone();
    let backend_addr = common::start_programmable_backend(move |head| {
        let cc = cc.clone();
        let seen = seen.clone();
        async move {
            seen.lock().unwrap().push(head.to_ascii_lowercase());
            let count = cc.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                (502, "{\"detail\":\"bad gateway\"}".into())
            } else {
                (200, serde_json::to_string(&sample_completion("from http")).unwrap())
            }
        }
    })
    .await;

    let mut config = fast_config();
    config.upstream.base_url = format!("http://{}", backend_addr);
    config.upstream.api_key = Some("secret-key".into());
    let upstream = Arc::new(HttpUpstream::new(&config.upstream).unwrap());
    let (addr, shutdown) = spawn_gateway(config, upstream, Arc::new(StaticMemoryProbe(MB))).await;

    let (status, body) = post_run(addr).await;
    assert_eq!(status, StatusCode::OK, "Should eventually succeed after retries");
    assert_eq!(body["attempts"], 3);
    assert_eq!(body["result"]["completion"], "from http");
    assert_eq!(call_count.load(Ordering::SeqCst), 3);

    let heads = heads.lock().unwrap();
    assert!(heads.iter().all(|h| h.starts_with("post /completions")));
    assert!(heads.iter().all(|h| h.contains("x-api-key: secret-key")));

    shutdown.trigger();
}

#[tokio::test]
async fn test_http_upstream_unreachable_is_upstream_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = fast_config();
    config.upstream.base_url = format!("http://{}", dead_addr);
    let upstream = Arc::new(HttpUpstream::new(&config.upstream).unwrap());
    let (addr, shutdown) = spawn_gateway(config, upstream, Arc::new(StaticMemoryProbe(MB))).await;

    let (status, body) = post_run(addr).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    shutdown.trigger();
}
