// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the storage contract and the coordinator (§6, §7).

use crate::job::{Job, JobId};
use thiserror::Error;

/// Errors surfaced by a `StorageProvider` implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// `save(jobs)` failed because one or more jobs in the batch had a stale
    /// `version`. Carries the conflicting (local, remote) pairs so a
    /// `ConcurrentJobModificationResolver` can decide per pair (§4.7).
    #[error("concurrent modification of {} job(s)", .conflicts.len())]
    ConcurrentJobModification { conflicts: Vec<JobConflict> },

    #[error("recurring job not found: {0}")]
    RecurringJobNotFound(String),

    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    #[error("illegal job state transition: {0}")]
    IllegalJobState(String),
}

/// A single conflicting pair discovered during a batch `save`.
#[derive(Debug, Clone)]
pub struct JobConflict {
    /// The in-memory job the caller attempted to persist.
    pub local: Job,
    /// The job as it currently exists in storage.
    pub remote: Job,
}

/// Errors surfaced when resolving a `JobDetails` descriptor to a callable
/// and invoking it (§4.5.1, §9 "Reflection for user job code").
#[derive(Debug, Error)]
pub enum JobExecutionError {
    #[error("no job registered for class `{class_name}`")]
    ClassNotFound { class_name: String },

    #[error("class `{class_name}` has no method `{method_name}`")]
    MethodNotFound { class_name: String, method_name: String },

    /// The user's job body returned an error. `message` and `stacktrace`
    /// are captured verbatim into `JobState::Failed` (§7).
    #[error("job execution failed: {message}")]
    Failed { message: String, stacktrace: String },
}

impl JobExecutionError {
    /// The `exceptionClass` value persisted into `JobState::Failed`,
    /// mirroring the §6 error-kind names so the default retry filter can
    /// recognize `JobClassNotFound`/`JobMethodNotFound` as non-retryable (§7).
    pub fn exception_class(&self) -> &'static str {
        match self {
            JobExecutionError::ClassNotFound { .. } => "JobClassNotFound",
            JobExecutionError::MethodNotFound { .. } => "JobMethodNotFound",
            JobExecutionError::Failed { .. } => "JobExecutionError",
        }
    }

    pub fn message(&self) -> String {
        match self {
            JobExecutionError::ClassNotFound { class_name } => {
                format!("no job registered for class `{class_name}`")
            }
            JobExecutionError::MethodNotFound { class_name, method_name } => {
                format!("class `{class_name}` has no method `{method_name}`")
            }
            JobExecutionError::Failed { message, .. } => message.clone(),
        }
    }

    pub fn stacktrace(&self) -> String {
        match self {
            JobExecutionError::Failed { stacktrace, .. } => stacktrace.clone(),
            other => other.to_string(),
        }
    }
}
