//! Upstream wire types and error definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Body accepted by `POST /completions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Token accounting reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion returned by the upstream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompletionResponse {
    pub completion: String,
    pub usage: Usage,
    pub model: String,
    pub timestamp: String,
}

/// Errors that can occur while calling the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The attempt exceeded its deadline.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be decoded.
    #[error("invalid upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Stable label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Decode(_) => "decode",
        }
    }
}
