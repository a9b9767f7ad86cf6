// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ServerCapacityMonitor` (§3 "BackgroundJobServerStatus"): samples the
//! capacity metrics a server announces and heartbeats — free system memory,
//! system-wide CPU load, and this process's own CPU load.

use bgjob_storage::CapacityMetrics;
use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// Wraps a `sysinfo::System`, refreshed on each sample. Held behind a mutex
/// because `System::refresh_*` takes `&mut self` while the monitor itself is
/// shared across the server's announce and heartbeat call sites.
pub struct ServerCapacityMonitor {
    system: Mutex<System>,
    pid: Pid,
}

impl ServerCapacityMonitor {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().unwrap_or(Pid::from(0));
        let mut system = System::new_all();
        system.refresh_all();
        Self { system: Mutex::new(system), pid }
    }

    /// Take a fresh sample (§3). Falls back to zeroed metrics if this
    /// process can no longer be found in the process table (e.g. a
    /// restricted sandbox) rather than failing the heartbeat that called it.
    pub fn sample(&self) -> CapacityMetrics {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_cpu();
        system.refresh_process(self.pid);

        let process_load_percent = system.process(self.pid).map(|p| p.cpu_usage() as f64).unwrap_or(0.0);
        let cpu_load_percent = if system.cpus().is_empty() {
            0.0
        } else {
            system.cpus().iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>() / system.cpus().len() as f64
        };

        CapacityMetrics {
            system_free_memory_bytes: system.free_memory(),
            cpu_load_percent,
            process_load_percent,
        }
    }
}

impl Default for ServerCapacityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "capacity_monitor_tests.rs"]
mod tests;
