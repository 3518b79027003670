//! Response bodies and error mapping.
//!
//! Only this module turns a `GatewayError` into a status code and body.
//! Internal details are logged elsewhere and never serialized here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::GatewayError;
use crate::gateway::CallOutcome;
use crate::http::request::set_request_id;
use crate::upstream::CompletionResponse;

/// Plain `{ "error": ... }` body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody { error: self.public_message() })).into_response()
    }
}

/// Successful `/run` envelope.
#[derive(Debug, Serialize)]
pub struct RunSuccess<'a> {
    pub request_id: &'a str,
    pub status: &'static str,
    pub latency_ms: u64,
    pub attempts: u32,
    pub result: &'a CompletionResponse,
}

/// Failed `/run` envelope.
#[derive(Debug, Serialize)]
pub struct RunFailure<'a> {
    pub request_id: &'a str,
    pub status: &'static str,
    pub latency_ms: u64,
    pub error: String,
}

/// `/run` response for an orchestrated call.
pub fn run_response(outcome: &CallOutcome) -> Response {
    let mut response = match &outcome.result {
        Ok(result) => Json(RunSuccess {
            request_id: outcome.request_id(),
            status: "success",
            latency_ms: outcome.latency_ms(),
            attempts: outcome.attempts(),
            result,
        })
        .into_response(),
        Err(e) => run_error_response(outcome.request_id(), outcome.latency_ms(), e),
    };
    set_request_id(response.headers_mut(), outcome.request_id());
    response
}

/// `/run` failure envelope for `error`.
pub fn run_error_response(request_id: &str, latency_ms: u64, error: &GatewayError) -> Response {
    let body = RunFailure {
        request_id,
        status: "error",
        latency_ms,
        error: error.public_message(),
    };
    let mut response = (error.status_code(), Json(body)).into_response();
    set_request_id(response.headers_mut(), request_id);
    response
}

/// Status code of a `Result` about to be rendered, for metrics.
pub fn status_of<T>(result: &Result<T, GatewayError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    }
}
