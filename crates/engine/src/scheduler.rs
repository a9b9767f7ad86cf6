// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobScheduler` (§2.1): the thin façade application code calls into.
//! Computes `jobSignature` (via `JobDetails::signature`), builds the initial
//! `JobState`, and hands the job to the `StorageProvider` — none of the
//! coordinator's machinery runs here.

use bgjob_core::{Clock, CronExpression, Job, JobDetails, JobId, RecurringJob, StorageError};
use bgjob_storage::StorageProvider;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub struct JobScheduler {
    storage: Arc<dyn StorageProvider>,
    clock: Arc<dyn Clock>,
}

impl JobScheduler {
    pub fn new(storage: Arc<dyn StorageProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// `enqueue` (§3 "Lifecycle"): create a job already `ENQUEUED` at now.
    pub async fn enqueue(&self, job_details: JobDetails) -> Result<Job, StorageError> {
        let job = Job::new(job_details, bgjob_core::JobState::Enqueued { enqueued_at: self.clock.now() });
        self.storage.save(job).await
    }

    /// `schedule` (§3 "Lifecycle"): create a job `SCHEDULED` for `at`.
    pub async fn schedule(&self, job_details: JobDetails, at: DateTime<Utc>) -> Result<Job, StorageError> {
        let job = Job::new(job_details, bgjob_core::JobState::Scheduled { scheduled_at: at, reason: None });
        self.storage.save(job).await
    }

    /// Register (or re-register, idempotently by `id`) a recurring job; the
    /// coordinator's recurring-jobs master task (§4.3 step 1) materializes
    /// its occurrences.
    pub async fn schedule_recurring(
        &self,
        id: impl Into<String>,
        job_details: JobDetails,
        cron_expression: CronExpression,
        zone_id: Tz,
    ) -> RecurringJob {
        let recurring = RecurringJob::new(id, job_details, cron_expression, zone_id);
        self.storage.save_recurring_job(recurring).await
    }

    /// Remove a recurring job; the coordinator purges any already-materialized
    /// `SCHEDULED` occurrence on its next tick (§4.3.1).
    pub async fn delete_recurring(&self, id: &str) -> Result<(), StorageError> {
        self.storage.delete_recurring_job(id).await
    }

    /// Cooperative delete (§5 "Cancellation"): appends `DELETED` to the job's
    /// history regardless of its current state. If the job is `PROCESSING`,
    /// the running worker only discovers this after the fact — deletion here
    /// is a request, not preemption (§1 Non-goals).
    pub async fn delete(&self, job_id: JobId, reason: impl Into<String>) -> Result<Job, StorageError> {
        let mut job = self.storage.get_job_by_id(job_id).await?;
        job.transition(bgjob_core::JobState::Deleted { deleted_at: self.clock.now(), reason: reason.into() });
        self.storage.save(job).await
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
