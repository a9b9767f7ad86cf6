// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-listener fan-out (§4.8): a single repeating timer drains three
//! notification kinds in sequence. Registration is eventually consistent —
//! listeners are never called synchronously from a `save`.

use crate::rate_limiter::RateLimiter;
use crate::stats::{BackgroundJobServerStatus, JobStats};
use bgjob_core::{Job, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

pub trait JobStatsChangeListener: Send + Sync {
    fn on_change(&self, stats: &JobStats);
}

pub trait JobChangeListener: Send + Sync {
    fn on_change(&self, job: &Job);
}

pub trait BackgroundJobServerStatusChangeListener: Send + Sync {
    fn on_change(&self, servers: &[BackgroundJobServerStatus]);
}

/// What the dispatcher's timer asks of its owning storage provider each tick.
/// Implemented by `InMemoryStorageProvider` so the dispatcher never needs to
/// know about the concrete backend's locking scheme.
pub trait ChangeSource: Send + Sync {
    fn snapshot_stats(&self) -> JobStats;
    fn snapshot_job(&self, id: JobId) -> Option<Job>;
    fn snapshot_servers(&self) -> Vec<BackgroundJobServerStatus>;
}

const INITIAL_DELAY: StdDuration = StdDuration::from_secs(3);
const PERIOD: StdDuration = StdDuration::from_secs(5);

pub struct ChangeListenerDispatcher {
    rate_limiter: RateLimiter,
    stats_listeners: Mutex<Vec<Box<dyn JobStatsChangeListener>>>,
    job_listeners: Mutex<HashMap<JobId, Vec<Box<dyn JobChangeListener>>>>,
    server_listeners: Mutex<Vec<Box<dyn BackgroundJobServerStatusChangeListener>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeListenerDispatcher {
    pub fn new(clock: Arc<dyn bgjob_core::Clock>, rate_per_second: f64) -> Self {
        Self {
            rate_limiter: RateLimiter::new(rate_per_second, clock),
            stats_listeners: Mutex::new(Vec::new()),
            job_listeners: Mutex::new(HashMap::new()),
            server_listeners: Mutex::new(Vec::new()),
            timer: Mutex::new(None),
        }
    }

    pub fn add_job_stats_listener(
        self: &Arc<Self>,
        source: Weak<dyn ChangeSource>,
        listener: Box<dyn JobStatsChangeListener>,
    ) {
        self.stats_listeners.lock().push(listener);
        self.start_if_needed(source);
    }

    pub fn add_job_listener(
        self: &Arc<Self>,
        source: Weak<dyn ChangeSource>,
        job_id: JobId,
        listener: Box<dyn JobChangeListener>,
    ) {
        self.job_listeners.lock().entry(job_id).or_default().push(listener);
        self.start_if_needed(source);
    }

    pub fn remove_job_listener(&self, job_id: JobId) {
        self.job_listeners.lock().remove(&job_id);
    }

    pub fn add_server_listener(
        self: &Arc<Self>,
        source: Weak<dyn ChangeSource>,
        listener: Box<dyn BackgroundJobServerStatusChangeListener>,
    ) {
        self.server_listeners.lock().push(listener);
        self.start_if_needed(source);
    }

    /// Start the fan-out timer on first registration. Guarded by a
    /// non-blocking `try_lock`: if another registration is already starting
    /// it, this call proceeds without double-scheduling (§4.8).
    fn start_if_needed(self: &Arc<Self>, source: Weak<dyn ChangeSource>) {
        let Some(mut guard) = self.timer.try_lock() else { return };
        if guard.is_some() {
            return;
        }
        let dispatcher = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            tokio::time::sleep(INITIAL_DELAY).await;
            let mut interval = tokio::time::interval(PERIOD);
            loop {
                interval.tick().await;
                let Some(source) = source.upgrade() else { break };
                dispatcher.tick(source.as_ref());
            }
        }));
    }

    /// Cancel the fan-out timer; called when the storage provider shuts down
    /// (§5 cancellation) or when the last listener is removed.
    pub fn stop(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }

    fn tick(&self, source: &dyn ChangeSource) {
        self.notify_stats(source);
        self.notify_jobs(source);
        self.notify_servers(source);
    }

    fn notify_stats(&self, source: &dyn ChangeSource) {
        let listeners = self.stats_listeners.lock();
        if listeners.is_empty() || !self.rate_limiter.try_acquire() {
            return;
        }
        let stats = source.snapshot_stats();
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_change(&stats))).is_err() {
                tracing::warn!("job stats change listener panicked");
            }
        }
    }

    fn notify_jobs(&self, source: &dyn ChangeSource) {
        let mut job_listeners = self.job_listeners.lock();
        let mut gone = Vec::new();
        for (job_id, listeners) in job_listeners.iter() {
            match source.snapshot_job(*job_id) {
                Some(job) => {
                    for listener in listeners {
                        if catch_unwind(AssertUnwindSafe(|| listener.on_change(&job))).is_err() {
                            tracing::warn!(%job_id, "job change listener panicked");
                        }
                    }
                }
                None => gone.push(*job_id),
            }
        }
        for job_id in gone {
            job_listeners.remove(&job_id);
        }
    }

    fn notify_servers(&self, source: &dyn ChangeSource) {
        let listeners = self.server_listeners.lock();
        if listeners.is_empty() {
            return;
        }
        let servers = source.snapshot_servers();
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_change(&servers))).is_err() {
                tracing::warn!("server status change listener panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "change_listener_tests.rs"]
mod tests;
