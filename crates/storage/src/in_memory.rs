// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `InMemoryStorageProvider`: the reference backend (§4.1.1). A
//! `parking_lot::Mutex`-guarded set of maps; page queries clone the filtered
//! subset, sort by the documented key, and slice `[offset, offset+limit)`.

use crate::change_listener::{
    BackgroundJobServerStatusChangeListener, ChangeListenerDispatcher, ChangeSource,
    JobChangeListener, JobStatsChangeListener,
};
use crate::page::PageRequest;
use crate::provider::StorageProvider;
use crate::stats::{BackgroundJobServerId, BackgroundJobServerStatus, CapacityMetrics, JobStats};
use async_trait::async_trait;
use bgjob_core::{Clock, Job, JobDetails, JobId, RecurringJob, StateName, StorageError, JobConflict};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct Inner {
    clock: Arc<dyn Clock>,
    jobs: Mutex<HashMap<JobId, Job>>,
    recurring_jobs: Mutex<HashMap<String, RecurringJob>>,
    servers: Mutex<HashMap<BackgroundJobServerId, BackgroundJobServerStatus>>,
    counters: Mutex<HashMap<StateName, u64>>,
    listeners: Arc<ChangeListenerDispatcher>,
}

impl ChangeSource for Inner {
    fn snapshot_stats(&self) -> JobStats {
        build_stats(&self.jobs.lock(), &self.counters.lock(), &self.recurring_jobs.lock(), &self.servers.lock())
    }

    fn snapshot_job(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().get(&id).cloned()
    }

    fn snapshot_servers(&self) -> Vec<BackgroundJobServerStatus> {
        self.servers.lock().values().cloned().collect()
    }
}

fn build_stats(
    jobs: &HashMap<JobId, Job>,
    counters: &HashMap<StateName, u64>,
    recurring: &HashMap<String, RecurringJob>,
    servers: &HashMap<BackgroundJobServerId, BackgroundJobServerStatus>,
) -> JobStats {
    let mut stats = JobStats {
        recurring_jobs: recurring.len() as u64,
        background_job_servers: servers.len() as u64,
        succeeded_lifetime: *counters.get(&StateName::Succeeded).unwrap_or(&0),
        ..Default::default()
    };
    for job in jobs.values() {
        match job.state_name() {
            StateName::Scheduled => stats.scheduled += 1,
            StateName::Enqueued => stats.enqueued += 1,
            StateName::Processing => stats.processing += 1,
            StateName::Succeeded => stats.succeeded += 1,
            StateName::Failed => stats.failed += 1,
            StateName::Deleted => stats.deleted += 1,
        }
    }
    stats
}

/// The in-scope concrete `StorageProvider` (§4.1.1): not a production
/// backend, but a conformance fixture satisfying every contract guarantee.
#[derive(Clone)]
pub struct InMemoryStorageProvider {
    inner: Arc<Inner>,
}

impl InMemoryStorageProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_change_notification_rate(clock, 5.0)
    }

    pub fn with_change_notification_rate(clock: Arc<dyn Clock>, rate_per_second: f64) -> Self {
        let listeners = Arc::new(ChangeListenerDispatcher::new(clock.clone(), rate_per_second));
        Self {
            inner: Arc::new(Inner {
                clock,
                jobs: Mutex::new(HashMap::new()),
                recurring_jobs: Mutex::new(HashMap::new()),
                servers: Mutex::new(HashMap::new()),
                counters: Mutex::new(HashMap::new()),
                listeners,
            }),
        }
    }

    fn weak_source(&self) -> Weak<dyn ChangeSource> {
        Arc::downgrade(&self.inner) as Weak<dyn ChangeSource>
    }

    /// Cancels the change-listener timer (§5 cancellation: "closes the
    /// storage provider, which cancels its own timer").
    pub fn shutdown(&self) {
        self.inner.listeners.stop();
    }
}

/// Optimistic-concurrency check (§4.1, §8): `candidate` is only accepted if
/// the currently-stored job's version matches `candidate.base_version()` —
/// the version this candidate's history was actually read from, not however
/// many local `transition` calls it has accumulated since (§4.6's
/// `on_state_election` can append a second state on top of one the caller
/// already chose, without that counting as a second mutation). A first-ever
/// save (`candidate.base_version() == 0`) is accepted iff no job with that
/// id exists yet.
fn check_conflict(existing: Option<&Job>, candidate: &Job) -> Result<(), JobConflict> {
    match existing {
        None => {
            if candidate.base_version() == 0 {
                Ok(())
            } else {
                Err(JobConflict { local: candidate.clone(), remote: candidate.clone() })
            }
        }
        Some(existing) => {
            if existing.version == candidate.base_version() {
                Ok(())
            } else {
                Err(JobConflict { local: candidate.clone(), remote: existing.clone() })
            }
        }
    }
}

/// Stamps the real persisted version onto `candidate` (§8: exactly one
/// version bump per accepted save, regardless of how many states
/// `on_state_election` chained onto it beforehand). Creation doesn't count
/// as a mutation of an existing version, so it persists whatever version the
/// candidate already carried.
fn persist(existing_version: Option<u64>, candidate: Job) -> Job {
    let new_version = match existing_version {
        None => candidate.version,
        Some(version) => version + 1,
    };
    let mut persisted = candidate;
    persisted.mark_persisted(new_version);
    persisted
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn save(&self, job: Job) -> Result<Job, StorageError> {
        let mut jobs = self.inner.jobs.lock();
        if let Err(conflict) = check_conflict(jobs.get(&job.id), &job) {
            return Err(StorageError::ConcurrentJobModification { conflicts: vec![conflict] });
        }
        let existing_version = jobs.get(&job.id).map(|j| j.version);
        let persisted = persist(existing_version, job);
        jobs.insert(persisted.id, persisted.clone());
        Ok(persisted)
    }

    async fn save_batch(&self, jobs_in: Vec<Job>) -> Result<Vec<Job>, StorageError> {
        let mut jobs = self.inner.jobs.lock();
        let mut conflicts = Vec::new();
        for candidate in &jobs_in {
            if let Err(conflict) = check_conflict(jobs.get(&candidate.id), candidate) {
                conflicts.push(conflict);
            }
        }
        if !conflicts.is_empty() {
            return Err(StorageError::ConcurrentJobModification { conflicts });
        }
        let mut persisted_jobs = Vec::with_capacity(jobs_in.len());
        for candidate in jobs_in {
            let existing_version = jobs.get(&candidate.id).map(|j| j.version);
            let persisted = persist(existing_version, candidate);
            jobs.insert(persisted.id, persisted.clone());
            persisted_jobs.push(persisted);
        }
        Ok(persisted_jobs)
    }

    async fn get_job_by_id(&self, id: JobId) -> Result<Job, StorageError> {
        self.inner.jobs.lock().get(&id).cloned().ok_or(StorageError::JobNotFound(id))
    }

    async fn get_jobs(&self, state: StateName, page: PageRequest) -> Vec<Job> {
        let jobs = self.inner.jobs.lock();
        let mut matching: Vec<Job> =
            jobs.values().filter(|j| j.state_name() == state).cloned().collect();
        matching.sort_by_key(|j| j.updated_at());
        page_slice(matching, page)
    }

    async fn get_jobs_updated_before(
        &self,
        state: StateName,
        updated_before: DateTime<Utc>,
        page: PageRequest,
    ) -> Vec<Job> {
        let jobs = self.inner.jobs.lock();
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|j| j.state_name() == state && j.updated_at() < updated_before)
            .cloned()
            .collect();
        matching.sort_by_key(|j| j.updated_at());
        page_slice(matching, page)
    }

    async fn get_scheduled_jobs(&self, before: DateTime<Utc>, page: PageRequest) -> Vec<Job> {
        self.get_jobs_updated_before(StateName::Scheduled, before, page).await
    }

    async fn delete_jobs(&self, state: StateName, updated_before: DateTime<Utc>) -> usize {
        let mut jobs = self.inner.jobs.lock();
        let to_delete: Vec<JobId> = jobs
            .values()
            .filter(|j| j.state_name() == state && j.updated_at() < updated_before)
            .map(|j| j.id)
            .collect();
        for id in &to_delete {
            jobs.remove(id);
        }
        to_delete.len()
    }

    async fn exists(&self, job_details: &JobDetails, state: StateName) -> bool {
        let signature = job_details.signature();
        self.inner
            .jobs
            .lock()
            .values()
            .any(|j| j.job_signature == signature && j.state_name() == state)
    }

    async fn count_jobs(&self, state: StateName) -> u64 {
        self.inner.jobs.lock().values().filter(|j| j.state_name() == state).count() as u64
    }

    async fn get_job_stats(&self) -> JobStats {
        self.inner.snapshot_stats()
    }

    async fn publish_job_stat_counter(&self, state: StateName, delta: u64) {
        *self.inner.counters.lock().entry(state).or_insert(0) += delta;
    }

    async fn get_recurring_jobs(&self) -> Vec<RecurringJob> {
        self.inner.recurring_jobs.lock().values().cloned().collect()
    }

    async fn save_recurring_job(&self, job: RecurringJob) -> RecurringJob {
        self.inner.recurring_jobs.lock().insert(job.id.clone(), job.clone());
        job
    }

    async fn delete_recurring_job(&self, id: &str) -> Result<(), StorageError> {
        self.inner
            .recurring_jobs
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::RecurringJobNotFound(id.to_string()))
    }

    async fn announce_background_job_server(
        &self,
        status: BackgroundJobServerStatus,
    ) -> BackgroundJobServerStatus {
        self.inner.servers.lock().insert(status.id, status.clone());
        status
    }

    async fn signal_background_job_server_alive(
        &self,
        id: BackgroundJobServerId,
        now: DateTime<Utc>,
        metrics: CapacityMetrics,
    ) -> Result<(), StorageError> {
        let mut servers = self.inner.servers.lock();
        let status = servers
            .get_mut(&id)
            .ok_or_else(|| StorageError::IllegalJobState(format!("unknown server {id}")))?;
        status.last_heartbeat = now;
        status.apply_capacity_metrics(metrics);
        Ok(())
    }

    async fn get_background_job_servers(&self) -> Vec<BackgroundJobServerStatus> {
        self.inner.servers.lock().values().cloned().collect()
    }

    async fn remove_timed_out_background_job_servers(&self, before: DateTime<Utc>) -> usize {
        let mut servers = self.inner.servers.lock();
        let before_count = servers.len();
        servers.retain(|_, status| status.last_heartbeat >= before);
        before_count - servers.len()
    }

    fn add_job_stats_change_listener(&self, listener: Box<dyn JobStatsChangeListener>) {
        self.inner.listeners.add_job_stats_listener(self.weak_source(), listener);
    }

    fn add_job_change_listener(&self, job_id: JobId, listener: Box<dyn JobChangeListener>) {
        self.inner.listeners.add_job_listener(self.weak_source(), job_id, listener);
    }

    fn remove_job_change_listener(&self, job_id: JobId) {
        self.inner.listeners.remove_job_listener(job_id);
    }

    fn add_background_job_server_status_change_listener(
        &self,
        listener: Box<dyn BackgroundJobServerStatusChangeListener>,
    ) {
        self.inner.listeners.add_server_listener(self.weak_source(), listener);
    }
}

fn page_slice(items: Vec<Job>, page: PageRequest) -> Vec<Job> {
    let end = (page.offset + page.limit).min(items.len());
    if page.offset >= items.len() {
        return Vec::new();
    }
    items[page.offset..end].to_vec()
}

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;
