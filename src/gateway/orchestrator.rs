//! Call orchestration.
//!
//! # Responsibilities
//! - Resolve the request identifier (inbound or generated)
//! - Compose CircuitBreaker(RetryExecutor(upstream call))
//! - Record every attempt with its latency and outcome
//! - Classify the overall outcome for the HTTP layer
//!
//! # Design Decisions
//! - The breaker and the upstream are injected, never global
//! - Each inbound call owns its RequestContext; nothing outlives the call
//! - Attempt and outcome logs carry `request_id` for correlation

use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{field, Instrument};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::context::{Attempt, AttemptOutcome, CallStatus, RequestContext};
use crate::observability::metrics;
use crate::resilience::timeouts::with_attempt_timeout;
use crate::resilience::{BreakerError, CircuitBreaker, RetryExecutor};
use crate::upstream::{CompletionResponse, Upstream, UpstreamError};

/// An inbound call as seen by the orchestrator.
#[derive(Debug, Clone)]
pub struct InboundCall {
    /// Caller-supplied identifier, if any.
    pub request_id: Option<String>,
    /// Body forwarded to the upstream unchanged.
    pub body: Value,
}

/// Result of one orchestrated call.
#[derive(Debug)]
pub struct CallOutcome {
    pub context: RequestContext,
    pub latency: Duration,
    pub result: Result<CompletionResponse, GatewayError>,
}

impl CallOutcome {
    pub fn request_id(&self) -> &str {
        self.context.request_id()
    }

    pub fn attempts(&self) -> u32 {
        self.context.attempt_count()
    }

    pub fn status(&self) -> CallStatus {
        self.context.status().unwrap_or(CallStatus::Failure)
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

/// Composes breaker, retries and the upstream into one call.
pub struct CallOrchestrator {
    upstream: Arc<dyn Upstream>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
    attempt_timeout: Duration,
    api_key: Option<String>,
}

impl CallOrchestrator {
    pub fn new(
        config: &GatewayConfig,
        upstream: Arc<dyn Upstream>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            upstream,
            breaker,
            retry: RetryExecutor::new(&config.retries),
            attempt_timeout: config.upstream.timeout(),
            api_key: config.upstream.api_key.clone(),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Serve one inbound call end to end.
    pub async fn handle(&self, call: InboundCall) -> CallOutcome {
        let request_id = call
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(RequestContext::generate_id);
        let mut context = RequestContext::new(request_id);

        let span = tracing::info_span!(
            "gateway_call",
            request_id = %context.request_id(),
            attempts = field::Empty,
            status = field::Empty,
            latency_ms = field::Empty,
        );

        let result = self.run(&mut context, &call.body).instrument(span.clone()).await;
        let latency = context.elapsed();
        let latency_ms = latency.as_millis() as u64;
        let status = context.status().unwrap_or(CallStatus::Failure);

        span.record("attempts", context.attempt_count());
        span.record("status", status.as_str());
        span.record("latency_ms", latency_ms);

        match &result {
            Ok(_) => tracing::info!(
                request_id = %context.request_id(),
                latency_ms,
                status = status.as_str(),
                attempts = context.attempt_count(),
                "Run request completed successfully"
            ),
            Err(e) => tracing::error!(
                request_id = %context.request_id(),
                latency_ms,
                status = status.as_str(),
                attempts = context.attempt_count(),
                error_kind = e.kind(),
                error = %e,
                "Run request failed"
            ),
        }

        CallOutcome { context, latency, result }
    }

    async fn run(&self, context: &mut RequestContext, body: &Value) -> Result<CompletionResponse, GatewayError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!(request_id = %context.request_id(), "API_KEY not configured");
            context.finish(CallStatus::Failure);
            return Err(GatewayError::Configuration("API_KEY is not set".to_string()));
        };

        let owned_id = context.request_id().to_string();
        let attempt_log = Mutex::new(Vec::new());

        let request_id = owned_id.as_str();
        let recorded = &attempt_log;
        let outcome = self
            .breaker
            .execute(move || {
                self.retry
                    .execute(move |attempt| self.attempt(attempt, request_id, body, api_key, recorded))
            })
            .await;

        for attempt in attempt_log.into_inner().unwrap_or_else(PoisonError::into_inner) {
            context.record_attempt(attempt);
        }

        match outcome {
            Ok(response) => {
                context.finish(CallStatus::Success);
                Ok(response)
            }
            Err(BreakerError::Open) => {
                context.finish(CallStatus::Rejected);
                Err(GatewayError::BreakerOpen)
            }
            Err(BreakerError::Inner(e)) => {
                context.finish(CallStatus::Failure);
                Err(GatewayError::Upstream { attempts: e.attempts, source: e.source })
            }
        }
    }

    async fn attempt(
        &self,
        sequence: u32,
        request_id: &str,
        body: &Value,
        api_key: &str,
        recorded: &Mutex<Vec<Attempt>>,
    ) -> Result<CompletionResponse, UpstreamError> {
        let started_at = Instant::now();
        tracing::info!(request_id, attempt = sequence, "Attempting gateway call");

        let result = with_attempt_timeout(self.attempt_timeout, self.upstream.call_completions(body, api_key)).await;

        let ended_at = Instant::now();
        let latency_ms = ended_at.duration_since(started_at).as_millis() as u64;
        let outcome = match &result {
            Ok(_) => {
                tracing::info!(request_id, attempt = sequence, latency_ms, status = "success", "Gateway call successful");
                metrics::record_attempt("success");
                AttemptOutcome::Success
            }
            Err(e) => {
                tracing::warn!(request_id, attempt = sequence, latency_ms, status = "failed", error = %e, "Gateway call failed");
                metrics::record_attempt(e.kind());
                AttemptOutcome::Failure(e.to_string())
            }
        };

        recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Attempt { sequence, started_at, ended_at, outcome });

        result
    }
}
