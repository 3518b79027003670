//! Request identifier handling.
//!
//! An inbound `x-request-id` is honored; otherwise the orchestrator
//! generates one. The chosen id is echoed on the response.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Header carrying the request identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Caller-supplied request id, if present and valid UTF-8.
pub fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Set the request id header on a response.
pub fn set_request_id(headers: &mut HeaderMap, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID, value);
    }
}
