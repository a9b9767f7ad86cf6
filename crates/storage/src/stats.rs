// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate views returned by the storage contract (§3, §4.1, §4.8).

use bgjob_core::define_uuid_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Identity of a `BackgroundJobServer` instance.
    pub struct BackgroundJobServerId;
}

/// Lifetime and point-in-time counts across job states, published to
/// `JobStatsChangeListener`s (§4.8).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub scheduled: u64,
    pub enqueued: u64,
    pub processing: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub deleted: u64,
    /// Lifetime succeeded count, surviving succeeded-retention deletes (§4.3 step 4).
    pub succeeded_lifetime: u64,
    pub recurring_jobs: u64,
    pub background_job_servers: u64,
}

/// The liveness record a `BackgroundJobServer` announces and heartbeats
/// (§4.9 master election, §5 cancellation). Carries the capacity metrics
/// named in the data model (§3): free system memory and CPU/process load,
/// sampled by `ServerCapacityMonitor` and refreshed on every heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundJobServerStatus {
    pub id: BackgroundJobServerId,
    pub first_heartbeat: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub running: bool,
    pub worker_pool_size: usize,
    pub poll_interval_seconds: u64,
    /// System-wide free memory, in bytes, at the last sample.
    pub system_free_memory_bytes: u64,
    /// System-wide CPU load, 0.0-100.0, at the last sample.
    pub cpu_load_percent: f64,
    /// This process's own CPU load, 0.0-100.0, at the last sample.
    pub process_load_percent: f64,
}

impl BackgroundJobServerStatus {
    pub fn new(
        id: BackgroundJobServerId,
        worker_pool_size: usize,
        poll_interval_seconds: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_heartbeat: now,
            last_heartbeat: now,
            running: true,
            worker_pool_size,
            poll_interval_seconds,
            system_free_memory_bytes: 0,
            cpu_load_percent: 0.0,
            process_load_percent: 0.0,
        }
    }

    /// Overwrite the capacity metrics with a fresh sample (§3, §4.9.1).
    pub fn with_capacity_metrics(mut self, metrics: CapacityMetrics) -> Self {
        self.system_free_memory_bytes = metrics.system_free_memory_bytes;
        self.cpu_load_percent = metrics.cpu_load_percent;
        self.process_load_percent = metrics.process_load_percent;
        self
    }

    pub fn apply_capacity_metrics(&mut self, metrics: CapacityMetrics) {
        self.system_free_memory_bytes = metrics.system_free_memory_bytes;
        self.cpu_load_percent = metrics.cpu_load_percent;
        self.process_load_percent = metrics.process_load_percent;
    }

    /// Live iff the last heartbeat is within `4 × pollInterval` of `now` (§4.9).
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        let timeout = chrono::Duration::seconds(4 * self.poll_interval_seconds as i64);
        now - self.last_heartbeat <= timeout
    }
}

/// One sample of the capacity metrics named in the data model (§3). Produced
/// by `bgjob_engine::ServerCapacityMonitor`; kept here rather than in the
/// engine crate because it travels on `BackgroundJobServerStatus`, which
/// crosses the storage contract.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapacityMetrics {
    pub system_free_memory_bytes: u64,
    pub cpu_load_percent: f64,
    pub process_load_percent: f64,
}
