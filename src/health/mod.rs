//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → monitor.rs (uptime, derive overall status)
//!     → memory.rs (sample process memory)
//!     → HealthSnapshot (200 when ok, 503 when error)
//! ```
//!
//! # Design Decisions
//! - Snapshots are computed on demand and never stored
//! - Memory sampling sits behind a trait so tests control the reading

pub mod memory;
pub mod monitor;

pub use memory::{MemoryProbe, ProcessMemoryProbe, StaticMemoryProbe};
pub use monitor::{CheckStatus, HealthChecks, HealthMonitor, HealthSnapshot};
