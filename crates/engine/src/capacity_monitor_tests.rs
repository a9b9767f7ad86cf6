// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sample_reports_nonzero_total_capacity_on_a_real_host() {
    let monitor = ServerCapacityMonitor::new();
    let first = monitor.sample();
    // A sandboxed CI host may still report zero free memory under strict
    // cgroup limits; the call must simply not panic and must be callable
    // repeatedly (the server heartbeats on every tick).
    let second = monitor.sample();
    assert!(first.cpu_load_percent >= 0.0);
    assert!(second.process_load_percent >= 0.0);
}
