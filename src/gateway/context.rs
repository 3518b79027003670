//! Per-request bookkeeping: attempts, timing and final status.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a single upstream attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

/// One execution of the upstream call. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub sequence: u32,
    pub started_at: Instant,
    pub ended_at: Instant,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn latency(&self) -> Duration {
        self.ended_at.duration_since(self.started_at)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Final classification of a logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Failure,
    Rejected,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Failure => "failure",
            CallStatus::Rejected => "rejected",
        }
    }
}

/// Record of one inbound call. Owned by the task serving it and dropped
/// once the response is produced.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    created_at: Instant,
    attempts: Vec<Attempt>,
    status: Option<CallStatus>,
}

impl RequestContext {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            created_at: Instant::now(),
            attempts: Vec::new(),
            status: None,
        }
    }

    /// Fresh identifier of the form `req_<unix millis>_<9 hex chars>`.
    pub fn generate_id() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("req_{}_{}", chrono::Utc::now().timestamp_millis(), &suffix[..9])
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn status(&self) -> Option<CallStatus> {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Append an attempt. Sequence numbers must grow by one from 1.
    pub fn record_attempt(&mut self, attempt: Attempt) {
        debug_assert_eq!(attempt.sequence, self.attempt_count() + 1);
        self.attempts.push(attempt);
    }

    pub fn finish(&mut self, status: CallStatus) {
        debug_assert!(status != CallStatus::Rejected || self.attempts.is_empty());
        self.status = Some(status);
    }
}
