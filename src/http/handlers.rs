//! Route handlers.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::GatewayError;
use crate::gateway::{InboundCall, RequestContext};
use crate::http::request::request_id_from_headers;
use crate::http::response::{run_error_response, run_response, status_of};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream::CompletionRequest;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let snapshot = state.health.snapshot();
    let status = if snapshot.is_ok() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    metrics::record_request("/health", status.as_u16(), start);
    (status, Json(snapshot)).into_response()
}

/// `POST /completions`
pub async fn completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = async {
        let Json(request) = payload.map_err(|e| GatewayError::Validation(e.body_text()))?;
        tracing::info!(
            max_tokens = ?request.max_tokens,
            temperature = ?request.temperature,
            "Received completions request"
        );
        let body = serde_json::to_value(&request).map_err(|e| GatewayError::Validation(e.to_string()))?;

        let outcome = state
            .orchestrator
            .handle(InboundCall { request_id: request_id_from_headers(&headers), body })
            .await;
        outcome.result
    }
    .await;

    metrics::record_request("/completions", status_of(&result).as_u16(), start);
    match result {
        Ok(completion) => Json(completion).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reply of the agent demo endpoint.
#[derive(Debug, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub timestamp: String,
    pub status: &'static str,
}

/// Simulated agent work per attempt.
const AGENT_WORK: Duration = Duration::from_millis(100);

/// The `message` field, unless it is missing or falsy.
fn agent_message(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// `POST /agent/demo`
pub async fn agent_demo(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let message = match payload {
        Ok(Json(body)) => agent_message(&body),
        Err(e) => {
            tracing::warn!(error = %e.body_text(), "Rejected agent demo body");
            None
        }
    };
    let Some(message) = message else {
        metrics::record_request("/agent/demo", 400, start);
        return GatewayError::Validation("Message is required".to_string()).into_response();
    };

    tracing::info!(message_len = message.len(), "Received agent demo request");

    let message = message.as_str();
    let result = state
        .orchestrator
        .retry()
        .execute(move |_| async move {
            tokio::time::sleep(AGENT_WORK).await;
            Ok::<_, GatewayError>(AgentReply {
                response: format!("Agent processed: \"{}\"", message),
                timestamp: chrono::Utc::now().to_rfc3339(),
                status: "completed",
            })
        })
        .await;

    match result {
        Ok(reply) => {
            tracing::info!("Agent demo completed");
            metrics::record_request("/agent/demo", 200, start);
            Json(reply).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Agent demo failed");
            metrics::record_request("/agent/demo", 500, start);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Agent processing failed" })),
            )
                .into_response()
        }
    }
}

/// `POST /run`
///
/// Any JSON body is forwarded as-is; an empty body is forwarded as `{}`.
pub async fn run(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let start = Instant::now();
    let request_id = request_id_from_headers(&headers);

    let body = if body.is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_slice::<Value>(&body)
    };

    let response = match body {
        Ok(body) => {
            tracing::info!(request_id = ?request_id, "Received /run request");
            let outcome = state.orchestrator.handle(InboundCall { request_id, body }).await;
            run_response(&outcome)
        }
        Err(e) => {
            let request_id = request_id.unwrap_or_else(RequestContext::generate_id);
            tracing::warn!(request_id = %request_id, error = %e, "Rejected /run body");
            let error = GatewayError::Validation("Request body must be valid JSON".to_string());
            run_error_response(&request_id, start.elapsed().as_millis() as u64, &error)
        }
    };

    metrics::record_request("/run", response.status().as_u16(), start);
    response
}
