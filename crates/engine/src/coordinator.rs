// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobZooKeeper`, the coordinator (§4.2-§4.9): the periodic control loop
//! each server instance runs. One call to [`JobZooKeeper::tick`] is one
//! *tick*; at most one tick is ever in flight per instance (enforced below,
//! not by the caller).

use crate::concurrent_modification::{ConcurrentJobModificationResolver, Resolution};
use crate::config::BackgroundJobServerConfiguration;
use crate::error::EngineError;
use crate::job_activator::JobActivator;
use crate::job_filters::JobFilter;
use crate::work_distribution::WorkDistributionStrategy;
use crate::worker_pool::WorkerPool;
use bgjob_core::{Clock, Job, JobConflict, JobId, JobState, ServerId, StateName};
use bgjob_storage::{BackgroundJobServerId, PageRequest, StorageProvider};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// After this many consecutive failed ticks the server self-terminates
/// (§7: "the first five are logged as warnings, the sixth shuts the server
/// down").
const MAX_CONSECUTIVE_TICK_FAILURES: u32 = 6;

/// The coordinator. Holds shared handles to the storage backend, clock,
/// config, and the collaborators described in §4 directly, rather than a
/// back-reference to the owning `BackgroundJobServer` (§9's "cyclic
/// references" note describes a handle-based design to avoid `Rc`/`Arc`
/// cycles; in this Rust port the coordinator never needs to call back into
/// the server, so composition — the server owns the coordinator outright —
/// avoids the cycle without needing the handle indirection at all).
pub struct JobZooKeeper {
    server_id: BackgroundJobServerId,
    storage: Arc<dyn StorageProvider>,
    clock: Arc<dyn Clock>,
    config: BackgroundJobServerConfiguration,
    filters: Vec<Arc<dyn JobFilter>>,
    resolver: Arc<dyn ConcurrentJobModificationResolver>,
    work_distribution: Arc<dyn WorkDistributionStrategy>,
    activator: Arc<dyn JobActivator>,
    worker_pool: Arc<WorkerPool>,
    /// Shared with the owning `BackgroundJobServer`: `Running` per §4.2 step 2.
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
    ticking: AtomicBool,
    pulling: AtomicBool,
    exception_count: AtomicU32,
    known_recurring_ids: Mutex<HashSet<String>>,
}

#[allow(clippy::too_many_arguments)]
impl JobZooKeeper {
    pub fn new(
        server_id: BackgroundJobServerId,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn Clock>,
        config: BackgroundJobServerConfiguration,
        filters: Vec<Arc<dyn JobFilter>>,
        resolver: Arc<dyn ConcurrentJobModificationResolver>,
        work_distribution: Arc<dyn WorkDistributionStrategy>,
        activator: Arc<dyn JobActivator>,
        worker_pool: Arc<WorkerPool>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            server_id,
            storage,
            clock,
            config,
            filters,
            resolver,
            work_distribution,
            activator,
            worker_pool,
            running,
            initialized: AtomicBool::new(false),
            ticking: AtomicBool::new(false),
            pulling: AtomicBool::new(false),
            exception_count: AtomicU32::new(0),
            known_recurring_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Called once by the server after it announces itself (§4.2 step 1:
    /// "If uninitialized ... return").
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// One tick (§4.2). `is_master` is supplied by the caller, which
    /// re-evaluates the roster every tick (§4.9); `Err` is only ever
    /// [`EngineError::TooManyConsecutiveFailures`], the caller's signal to
    /// stop the server.
    pub async fn tick(&self, is_master: bool) -> Result<(), EngineError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        if !acquire(&self.ticking) {
            // Another tick is still in flight; this one is skipped (§4.2).
            return Ok(());
        }
        let result = self.tick_inner(is_master).await;
        release(&self.ticking);
        self.handle_tick_result(result)
    }

    fn handle_tick_result(&self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        match result {
            Ok(()) => {
                self.exception_count.store(0, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                let count = self.exception_count.fetch_add(1, Ordering::AcqRel) + 1;
                if count >= MAX_CONSECUTIVE_TICK_FAILURES {
                    tracing::error!(error = %err, count, "background job server stopping after too many consecutive tick failures");
                    Err(EngineError::TooManyConsecutiveFailures(count))
                } else {
                    tracing::warn!(error = %err, count, "zookeeper tick failed, will retry next tick");
                    Ok(())
                }
            }
        }
    }

    async fn tick_inner(&self, is_master: bool) -> Result<(), EngineError> {
        let can_onboard = self.can_onboard_new_work();
        if can_onboard && is_master {
            self.run_master_tasks().await?;
        }
        self.heartbeat_processing_jobs().await?;
        if can_onboard {
            self.pull_enqueued_work().await?;
        }
        Ok(())
    }

    /// `canOnboardNewWork()` (§4.2 step 2): running, with free worker capacity.
    fn can_onboard_new_work(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.worker_pool.free_capacity() > 0
    }

    // ---- Master tasks (§4.3), executed in order ----

    async fn run_master_tasks(&self) -> Result<(), EngineError> {
        self.materialize_recurring_jobs_and_purge_removed().await?;
        self.enqueue_scheduled_jobs_due().await?;
        self.fail_orphaned_jobs().await?;
        self.retain_succeeded().await?;
        self.delete_expired_deleted().await?;
        self.remove_timed_out_servers().await;
        Ok(())
    }

    /// §4.1/§4.9: purge servers whose `lastHeartbeat` has fallen outside the
    /// same `4 × pollInterval` window master election already uses to decide
    /// liveness (`BackgroundJobServerStatus::is_live`). The storage contract
    /// exposes `removeTimedOutBackgroundJobServers` but §4.3 never names a
    /// caller for it; without this the roster (and the dashboard's server
    /// list, §6) would accumulate dead entries forever.
    async fn remove_timed_out_servers(&self) {
        let threshold = self.clock.now() - self.config.orphan_staleness_threshold();
        let removed = self.storage.remove_timed_out_background_job_servers(threshold).await;
        if removed > 0 {
            tracing::info!(removed, "removed timed-out background job servers from the roster");
        }
    }

    /// Step 1 (§4.3) plus the added step 6 (§4.3.1): materialize one
    /// `SCHEDULED` occurrence per recurring job lacking a live instance, then
    /// purge scheduled occurrences of any recurring job removed since the
    /// last tick.
    async fn materialize_recurring_jobs_and_purge_removed(&self) -> Result<(), EngineError> {
        let now = self.clock.now();
        let recurring_jobs = self.storage.get_recurring_jobs().await;

        let mut current_ids = HashSet::with_capacity(recurring_jobs.len());
        let mut to_materialize = Vec::new();
        for recurring in &recurring_jobs {
            current_ids.insert(recurring.id.clone());
            let in_scheduled = self.storage.exists(&recurring.job_details, StateName::Scheduled).await;
            let in_enqueued = self.storage.exists(&recurring.job_details, StateName::Enqueued).await;
            let in_processing = self.storage.exists(&recurring.job_details, StateName::Processing).await;
            if in_scheduled || in_enqueued || in_processing {
                continue;
            }
            let next = recurring.cron_expression.next_after(now, recurring.zone_id).unwrap_or(now);
            let job = Job::new(recurring.job_details.clone(), JobState::Scheduled { scheduled_at: next, reason: None })
                .with_recurring_job_id(recurring.id.clone());
            to_materialize.push(job);
        }
        if !to_materialize.is_empty() {
            self.save_batch(to_materialize).await?;
        }

        let removed_ids: Vec<String> = {
            let mut known = self.known_recurring_ids.lock();
            let removed: Vec<String> = known.difference(&current_ids).cloned().collect();
            *known = current_ids;
            removed
        };
        for removed_id in removed_ids {
            self.purge_scheduled_occurrences_of(&removed_id).await?;
        }
        Ok(())
    }

    /// §4.3.1: any `SCHEDULED` occurrence whose `recurringJobId` matches a
    /// just-removed recurring job is transitioned to `DELETED`.
    ///
    /// Scans scheduled jobs in fixed bulk pages filtering client-side by
    /// `recurring_job_id`; this terminates once a page contains no more
    /// matches, which is sufficient in practice (recurring-job deletion is
    /// rare and a given id materializes at most one live occurrence at a
    /// time, per invariant 3).
    async fn purge_scheduled_occurrences_of(&self, recurring_job_id: &str) -> Result<(), EngineError> {
        loop {
            let page = self.storage.get_jobs(StateName::Scheduled, PageRequest::bulk()).await;
            let matching: Vec<Job> =
                page.into_iter().filter(|j| j.recurring_job_id.as_deref() == Some(recurring_job_id)).collect();
            if matching.is_empty() {
                return Ok(());
            }
            let now = self.clock.now();
            let transitioned = transition_all(matching, |_| JobState::Deleted {
                deleted_at: now,
                reason: "Recurring job deleted".to_string(),
            });
            self.save_batch(transitioned).await?;
        }
    }

    /// Step 2 (§4.3): jobs `SCHEDULED` for no later than `now + pollInterval`
    /// (the early-enqueue window) become `ENQUEUED`.
    async fn enqueue_scheduled_jobs_due(&self) -> Result<(), EngineError> {
        let window = self.clock.now()
            + chrono::Duration::from_std(self.config.poll_interval).unwrap_or_else(|_| chrono::Duration::zero());
        loop {
            let due = self.storage.get_scheduled_jobs(window, PageRequest::bulk()).await;
            if due.is_empty() {
                return Ok(());
            }
            let now = self.clock.now();
            let transitioned = transition_all(due, |_| JobState::Enqueued { enqueued_at: now });
            self.save_batch(transitioned).await?;
        }
    }

    /// Step 3 (§4.3): jobs `PROCESSING` with `updatedAt` older than
    /// `4 × pollInterval` are orphaned (invariant 4).
    async fn fail_orphaned_jobs(&self) -> Result<(), EngineError> {
        let threshold = self.clock.now() - self.config.orphan_staleness_threshold();
        loop {
            let stale = self.storage.get_jobs_updated_before(StateName::Processing, threshold, PageRequest::bulk()).await;
            if stale.is_empty() {
                return Ok(());
            }
            let now = self.clock.now();
            let transitioned = transition_all(stale, |_| JobState::Failed {
                failed_at: now,
                exception_class: "OrphanedJob".to_string(),
                message: "Orphaned job".to_string(),
                stacktrace: String::new(),
            });
            self.save_batch(transitioned).await?;
        }
    }

    /// Step 4 (§4.3, invariant 5): `SUCCEEDED` jobs older than
    /// `deleteSucceededJobsAfter` (default 36h) become `DELETED`; the count
    /// is published to the lifetime counter.
    async fn retain_succeeded(&self) -> Result<(), EngineError> {
        let threshold = self.clock.now()
            - chrono::Duration::from_std(self.config.delete_succeeded_jobs_after).unwrap_or_else(|_| chrono::Duration::zero());
        loop {
            let due = self.storage.get_jobs_updated_before(StateName::Succeeded, threshold, PageRequest::bulk()).await;
            if due.is_empty() {
                return Ok(());
            }
            let count = due.len() as u64;
            let now = self.clock.now();
            let transitioned = transition_all(due, |_| JobState::Deleted {
                deleted_at: now,
                reason: "Succeeded retention expired".to_string(),
            });
            self.save_batch(transitioned).await?;
            self.storage.publish_job_stat_counter(StateName::Succeeded, count).await;
        }
    }

    /// Step 5 (§4.3, invariant 5): `DELETED` jobs older than
    /// `permanentlyDeleteDeletedJobsAfter` (default 72h) are physically removed.
    async fn delete_expired_deleted(&self) -> Result<(), EngineError> {
        let threshold = self.clock.now()
            - chrono::Duration::from_std(self.config.permanently_delete_deleted_jobs_after)
                .unwrap_or_else(|_| chrono::Duration::zero());
        self.storage.delete_jobs(StateName::Deleted, threshold).await;
        Ok(())
    }

    // ---- Heartbeat (§4.2 step 3) ----

    /// Refresh `updatedAt` on every currently-`PROCESSING` job this server
    /// owns (§5 "Shared mutable state": a snapshot of `currentlyProcessedJobs`,
    /// tolerant of concurrent add/remove by worker tasks).
    async fn heartbeat_processing_jobs(&self) -> Result<(), EngineError> {
        let now = self.clock.now();
        let snapshot = self.worker_pool.currently_processed().snapshot();
        let mut proposed = Vec::with_capacity(snapshot.len());
        for mut job in snapshot {
            let JobState::Processing { started_at, server_id, .. } = *job.state() else { continue };
            job.transition(JobState::Processing { started_at, updated_at: now, server_id });
            proposed.push(job);
        }
        if proposed.is_empty() {
            return Ok(());
        }
        let saved = self.save_batch(proposed).await?;
        for job in saved {
            self.worker_pool.currently_processed().insert(job);
        }
        Ok(())
    }

    // ---- Enqueued-work pull (§4.4, §4.5) ----

    /// Guarded by a `tryLock`-style flag (§4.4): concurrent calls from the
    /// scheduled tick and the worker-idle callback (§4.5) are safe, and a
    /// pull already in flight causes the caller to skip rather than block.
    pub async fn pull_enqueued_work(&self) -> Result<(), EngineError> {
        if !acquire(&self.pulling) {
            return Ok(());
        }
        let result = self.pull_enqueued_work_inner().await;
        release(&self.pulling);
        result
    }

    async fn pull_enqueued_work_inner(&self) -> Result<(), EngineError> {
        let processing = self.worker_pool.currently_processed().len();
        let page = self.work_distribution.get_work_page_request(self.worker_pool.pool_size(), processing);
        if page.limit == 0 {
            return Ok(());
        }
        let candidates = self.storage.get_jobs(StateName::Enqueued, page).await;
        for job in candidates {
            self.acquire_and_run(job).await?;
        }
        Ok(())
    }

    /// The moment of acquisition (§4.4): transition to `PROCESSING` and save.
    /// `save` already runs the resolver on any conflict (the common case: a
    /// peer server acquired the same job first); only a RetryTick/Fatal
    /// verdict still surfaces here, and either one fails this tick.
    async fn acquire_and_run(&self, job: Job) -> Result<(), EngineError> {
        let now = self.clock.now();
        let server_id = ServerId::from_uuid(self.server_id.as_uuid());
        let mut acquiring = job;
        acquiring.transition(JobState::Processing { started_at: now, updated_at: now, server_id });

        let saved = self.save(acquiring).await?;

        let activator = self.activator.clone();
        let storage = self.storage.clone();
        let clock = self.clock.clone();
        let filters = self.filters.clone();
        let resolver = self.resolver.clone();
        self.worker_pool.submit(saved, move |job| async move {
            run_job(job, activator, storage, clock, filters, resolver).await;
        });
        Ok(())
    }

    // ---- Filter-aware persistence (§4.6, §4.7) ----

    async fn save(&self, job: Job) -> Result<Job, EngineError> {
        apply_save(&self.storage, &self.filters, &self.resolver, job).await
    }

    async fn save_batch(&self, jobs: Vec<Job>) -> Result<Vec<Job>, EngineError> {
        apply_save_batch(&self.storage, &self.filters, &self.resolver, jobs).await
    }
}

fn transition_all(jobs: Vec<Job>, mut next: impl FnMut(&Job) -> JobState) -> Vec<Job> {
    jobs.into_iter()
        .map(|mut job| {
            let state = next(&job);
            job.transition(state);
            job
        })
        .collect()
}

/// `tryLock`: `true` means the caller now holds the flag and must call
/// [`release`] when done; `false` means someone else holds it.
fn acquire(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
}

fn release(flag: &AtomicBool) {
    flag.store(false, Ordering::Release);
}

/// Execute a job's body via the activator and persist the outcome (§4.5.1).
/// A free function (not a method) so it can be handed to
/// [`WorkerPool::submit`], which requires a `'static` closure independent of
/// the coordinator's borrow.
async fn run_job(
    job: Job,
    activator: Arc<dyn JobActivator>,
    storage: Arc<dyn StorageProvider>,
    clock: Arc<dyn Clock>,
    filters: Vec<Arc<dyn JobFilter>>,
    resolver: Arc<dyn ConcurrentJobModificationResolver>,
) {
    let job_id = job.id;
    let started = clock.now();
    let result = activator.run(&job.job_details).await;
    let now = clock.now();

    let mut finished = job;
    match result {
        Ok(()) => {
            finished.transition(JobState::Succeeded { succeeded_at: now, duration: now - started });
        }
        Err(err) => {
            finished.transition(JobState::Failed {
                failed_at: now,
                exception_class: err.exception_class().to_string(),
                message: err.message(),
                stacktrace: err.stacktrace(),
            });
        }
    }

    if let Err(err) = apply_save(&storage, &filters, &resolver, finished).await {
        tracing::warn!(%job_id, error = %err, "failed to persist job execution result");
    }
}

/// Single-job save with filters (§4.6) and conflict resolution (§4.7).
/// `Allow` reapplies the proposed state on top of the fresh remote version
/// and retries; `RetryTick`/`Fatal` both surface as an error (the caller —
/// the tick — treats either as a failed tick; only `Fatal` is meant to, but
/// distinguishing them further would require threading resolver verdicts
/// through the tick's exception counter, which §7 does not ask for).
async fn apply_save(
    storage: &Arc<dyn StorageProvider>,
    filters: &[Arc<dyn JobFilter>],
    resolver: &Arc<dyn ConcurrentJobModificationResolver>,
    mut job: Job,
) -> Result<Job, EngineError> {
    for filter in filters {
        filter.on_state_election(&mut job);
    }
    loop {
        match storage.save(job.clone()).await {
            Ok(saved) => {
                for filter in filters {
                    filter.on_state_applied(&saved);
                }
                return Ok(saved);
            }
            Err(bgjob_core::StorageError::ConcurrentJobModification { conflicts }) => {
                let conflict = single_conflict(conflicts)?;
                match resolver.resolve(&conflict) {
                    Resolution::Allow => {
                        job = reapply(conflict, job.state().clone());
                    }
                    Resolution::RetryTick | Resolution::Fatal => {
                        return Err(EngineError::Storage(bgjob_core::StorageError::ConcurrentJobModification {
                            conflicts: vec![conflict],
                        }));
                    }
                }
            }
            Err(other) => return Err(EngineError::Storage(other)),
        }
    }
}

/// Batch save with filters and per-conflict resolution (§4.6, §4.7). Jobs
/// resolved `Allow` are retried (rebuilt on top of the fresh remote version);
/// jobs resolved `RetryTick` are dropped from the batch; any `Fatal`
/// verdict fails the whole call.
async fn apply_save_batch(
    storage: &Arc<dyn StorageProvider>,
    filters: &[Arc<dyn JobFilter>],
    resolver: &Arc<dyn ConcurrentJobModificationResolver>,
    jobs: Vec<Job>,
) -> Result<Vec<Job>, EngineError> {
    let mut pending = jobs;
    for job in &mut pending {
        for filter in filters {
            filter.on_state_election(job);
        }
    }
    loop {
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        match storage.save_batch(pending.clone()).await {
            Ok(saved) => {
                for job in &saved {
                    for filter in filters {
                        filter.on_state_applied(job);
                    }
                }
                return Ok(saved);
            }
            Err(bgjob_core::StorageError::ConcurrentJobModification { conflicts }) => {
                let conflicted_ids: HashSet<JobId> = conflicts.iter().map(|c| c.local.id).collect();
                let mut next_pending: Vec<Job> =
                    pending.into_iter().filter(|job| !conflicted_ids.contains(&job.id)).collect();
                for conflict in conflicts {
                    match resolver.resolve(&conflict) {
                        Resolution::Allow => {
                            let proposed = conflict.local.state().clone();
                            next_pending.push(reapply(conflict, proposed));
                        }
                        Resolution::RetryTick => {}
                        Resolution::Fatal => {
                            return Err(EngineError::Storage(bgjob_core::StorageError::ConcurrentJobModification {
                                conflicts: vec![conflict],
                            }));
                        }
                    }
                }
                pending = next_pending;
            }
            Err(other) => return Err(EngineError::Storage(other)),
        }
    }
}

fn single_conflict(conflicts: Vec<JobConflict>) -> Result<JobConflict, EngineError> {
    conflicts
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::Storage(bgjob_core::StorageError::IllegalJobState("empty conflict list".to_string())))
}

fn reapply(conflict: JobConflict, proposed_state: JobState) -> Job {
    let mut retried = conflict.remote;
    retried.transition(proposed_state);
    retried
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
