//! Process memory sampling.

use std::sync::{Mutex, PoisonError};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Source of the current process memory usage.
///
/// The health limit is compared against whatever this reports. A Rust
/// process has no managed heap to measure, so the process probe reports
/// resident set size as the heap figure.
pub trait MemoryProbe: Send + Sync {
    /// Bytes in use, or `None` if the value cannot be read.
    fn used_bytes(&self) -> Option<u64>;
}

/// Reads the resident memory of this process through sysinfo.
pub struct ProcessMemoryProbe {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resolve current pid; memory checks disabled");
                None
            }
        };
        Self { pid, system: Mutex::new(System::new()) }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|process| process.memory())
    }
}

/// Fixed reading, for tests and for platforms without process stats.
#[derive(Debug, Clone, Copy)]
pub struct StaticMemoryProbe(pub u64);

impl MemoryProbe for StaticMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}
