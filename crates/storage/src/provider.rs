// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage contract (§4.1). The coordinator depends only on this trait;
//! `InMemoryStorageProvider` is the concrete reference backend (§4.1.1).

use crate::change_listener::{
    BackgroundJobServerStatusChangeListener, JobChangeListener, JobStatsChangeListener,
};
use crate::page::PageRequest;
use crate::stats::{BackgroundJobServerId, BackgroundJobServerStatus, JobStats};
use async_trait::async_trait;
use crate::stats::CapacityMetrics;
use bgjob_core::{Job, JobDetails, JobId, RecurringJob, StateName, StorageError};
use chrono::{DateTime, Utc};

/// Abstract persistence for jobs, recurring jobs, servers, and counters.
///
/// Every method that can race with a concurrent writer resolves the race via
/// optimistic concurrency on `Job::base_version` (§4.1): implementations
/// never silently overwrite a version other than the one a job was last read
/// from, and a successful save bumps the stored version by exactly one no
/// matter how many states were appended locally beforehand (§8). Conflicts
/// fail with `StorageError::ConcurrentJobModification`.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persist one job. Fails with `ConcurrentJobModification` if the stored
    /// version of `job.id` no longer matches `job.base_version()`.
    async fn save(&self, job: Job) -> Result<Job, StorageError>;

    /// Persist a batch atomically: either every job in `jobs` is written, or
    /// none are, and any stale member is reported as a conflict (§4.1).
    async fn save_batch(&self, jobs: Vec<Job>) -> Result<Vec<Job>, StorageError>;

    async fn get_job_by_id(&self, id: JobId) -> Result<Job, StorageError>;

    /// Jobs in `state`, ordered by `updatedAt` ascending.
    async fn get_jobs(&self, state: StateName, page: PageRequest) -> Vec<Job>;

    /// Jobs in `state` whose `updatedAt < updated_before`, ordered ascending.
    async fn get_jobs_updated_before(
        &self,
        state: StateName,
        updated_before: DateTime<Utc>,
        page: PageRequest,
    ) -> Vec<Job>;

    /// `SCHEDULED` jobs whose `scheduledAt < before`, ordered ascending.
    async fn get_scheduled_jobs(&self, before: DateTime<Utc>, page: PageRequest) -> Vec<Job>;

    /// Physically delete every job in `state` with `updatedAt < updated_before`.
    /// Returns the number deleted.
    async fn delete_jobs(&self, state: StateName, updated_before: DateTime<Utc>) -> usize;

    /// True iff any job with `job_details`'s signature is currently in `state`.
    async fn exists(&self, job_details: &JobDetails, state: StateName) -> bool;

    async fn count_jobs(&self, state: StateName) -> u64;

    async fn get_job_stats(&self) -> JobStats;

    /// Increment the persisted lifetime counter for `state` by `delta`.
    async fn publish_job_stat_counter(&self, state: StateName, delta: u64);

    async fn get_recurring_jobs(&self) -> Vec<RecurringJob>;

    async fn save_recurring_job(&self, job: RecurringJob) -> RecurringJob;

    async fn delete_recurring_job(&self, id: &str) -> Result<(), StorageError>;

    async fn announce_background_job_server(
        &self,
        status: BackgroundJobServerStatus,
    ) -> BackgroundJobServerStatus;

    /// Heartbeat an already-announced server; refreshes `lastHeartbeat` and
    /// the capacity metrics (§3).
    async fn signal_background_job_server_alive(
        &self,
        id: BackgroundJobServerId,
        now: DateTime<Utc>,
        metrics: CapacityMetrics,
    ) -> Result<(), StorageError>;

    async fn get_background_job_servers(&self) -> Vec<BackgroundJobServerStatus>;

    /// Remove servers whose `lastHeartbeat < before`; returns how many were removed.
    async fn remove_timed_out_background_job_servers(&self, before: DateTime<Utc>) -> usize;

    /// Register a job-stats listener. The change-listener timer (§4.8) is
    /// started lazily on first registration.
    fn add_job_stats_change_listener(&self, listener: Box<dyn JobStatsChangeListener>);

    /// Register a listener for a single job's updates, removed automatically
    /// once that job no longer exists (§4.8).
    fn add_job_change_listener(&self, job_id: JobId, listener: Box<dyn JobChangeListener>);

    fn remove_job_change_listener(&self, job_id: JobId);

    fn add_background_job_server_status_change_listener(
        &self,
        listener: Box<dyn BackgroundJobServerStatusChangeListener>,
    );
}
