//! Process health reporting.
//!
//! # Responsibilities
//! - Report uptime and memory pressure on demand
//! - Derive the overall status from the individual checks
//!
//! The upstream check is reported but not probed.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::HealthConfig;
use crate::health::memory::MemoryProbe;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

/// Individual checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthChecks {
    /// Serialized under the name existing `/health` consumers read.
    #[serde(rename = "fastapi")]
    pub upstream: CheckStatus,
    pub memory: CheckStatus,
}

/// Health payload served at `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: CheckStatus,
    pub timestamp: String,
    /// Milliseconds since the monitor was created.
    pub uptime: u64,
    pub version: &'static str,
    pub environment: String,
    pub checks: HealthChecks,
}

impl HealthSnapshot {
    pub fn is_ok(&self) -> bool {
        self.status == CheckStatus::Ok
    }
}

/// Computes a fresh snapshot on every call. Holds no mutable state.
pub struct HealthMonitor {
    started_at: Instant,
    memory_limit_bytes: u64,
    environment: String,
    probe: Arc<dyn MemoryProbe>,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig, environment: impl Into<String>, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            started_at: Instant::now(),
            memory_limit_bytes: config.memory_limit_mb.saturating_mul(BYTES_PER_MB),
            environment: environment.into(),
            probe,
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let memory = match self.probe.used_bytes() {
            Some(used) if used >= self.memory_limit_bytes => CheckStatus::Error,
            _ => CheckStatus::Ok,
        };

        let status = if memory == CheckStatus::Ok { CheckStatus::Ok } else { CheckStatus::Error };

        let snapshot = HealthSnapshot {
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: self.started_at.elapsed().as_millis() as u64,
            version: env!("CARGO_PKG_VERSION"),
            environment: self.environment.clone(),
            checks: HealthChecks { upstream: CheckStatus::Ok, memory },
        };

        if !snapshot.is_ok() {
            tracing::warn!(
                memory = ?snapshot.checks.memory,
                uptime_ms = snapshot.uptime,
                "Health check failed"
            );
        }

        snapshot
    }
}
