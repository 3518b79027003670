//! Upstream service integration.
//!
//! # Data Flow
//! ```text
//! CallOrchestrator
//!     → Upstream trait (call_completions / ping)
//!     → client.rs (reqwest, X-API-Key header)
//!     → upstream service
//! ```
//!
//! # Design Decisions
//! - The trait is the seam the orchestrator depends on; tests plug in fakes
//! - Any non-2xx status or transport failure is an `UpstreamError`
//! - The API key is passed per call, never stored in the client

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use client::HttpUpstream;
pub use types::{CompletionRequest, CompletionResponse, UpstreamError, Usage};

/// The upstream-call collaborator.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Forward a completions body, authenticating with `api_key`.
    async fn call_completions(&self, body: &Value, api_key: &str) -> Result<CompletionResponse, UpstreamError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<Value, UpstreamError>;
}
