// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Job` aggregate: identity, descriptor, and append-only history (§3).

use crate::id::define_uuid_id;
use crate::job_details::JobDetails;
use crate::job_state::{JobState, StateName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

define_uuid_id! {
    /// Unique identifier for a job instance.
    pub struct JobId;
}

/// A job instance: a descriptor plus its append-only state history.
///
/// `history` is never empty after construction (invariant 1, §3) and is only
/// ever grown through [`Job::transition`], which is the single place that can
/// append a new state and bump `version`.
///
/// `version` and `base_version` are deliberately distinct. `transition`
/// bumps `version` on every local append, including ones made by
/// `on_state_election` filters on top of a state the caller already chose
/// (§4.6) — a single `save` can carry more than one freshly-appended state.
/// `base_version` never moves except when a `StorageProvider` actually
/// persists the job (`mark_persisted`), so it always names the version this
/// job's in-memory history is *based on*. Optimistic concurrency (§4.1,
/// invariant 2) compares a candidate's `base_version` against storage's
/// current version, and a successful save bumps the persisted version by
/// exactly one regardless of how many states were appended beforehand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "JobWire")]
pub struct Job {
    pub id: JobId,
    pub job_details: JobDetails,
    pub job_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_job_id: Option<String>,
    pub version: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    history: Vec<JobState>,
    /// Not on the wire (§6): a job arriving over serde is assumed freshly
    /// persisted, so it starts in sync with `version` (see the `From<JobWire>`
    /// impl below).
    #[serde(skip)]
    base_version: u64,
}

/// Deserialization shadow of [`Job`] carrying exactly the wire fields of §6;
/// `Job::from` derives `base_version` from `version` since a deserialized job
/// is always treated as the current persisted baseline.
#[derive(Deserialize)]
struct JobWire {
    id: JobId,
    job_details: JobDetails,
    job_signature: String,
    #[serde(default)]
    recurring_job_id: Option<String>,
    version: u64,
    #[serde(default)]
    metadata: HashMap<String, String>,
    history: Vec<JobState>,
}

impl From<JobWire> for Job {
    fn from(wire: JobWire) -> Self {
        Job {
            id: wire.id,
            job_details: wire.job_details,
            job_signature: wire.job_signature,
            recurring_job_id: wire.recurring_job_id,
            version: wire.version,
            metadata: wire.metadata,
            history: wire.history,
            base_version: wire.version,
        }
    }
}

impl Job {
    /// Construct a new job already in `initial_state`, at `version` 0.
    pub fn new(job_details: JobDetails, initial_state: JobState) -> Self {
        let job_signature = job_details.signature();
        Self {
            id: JobId::new(),
            job_details,
            job_signature,
            recurring_job_id: None,
            version: 0,
            metadata: HashMap::new(),
            history: vec![initial_state],
            base_version: 0,
        }
    }

    pub fn with_recurring_job_id(mut self, id: impl Into<String>) -> Self {
        self.recurring_job_id = Some(id.into());
        self
    }

    /// The current (most recent) state. Never panics: `history` is never empty.
    pub fn state(&self) -> &JobState {
        match self.history.last() {
            Some(state) => state,
            None => unreachable!("Job::history is never empty (invariant 1)"),
        }
    }

    pub fn state_name(&self) -> StateName {
        self.state().name()
    }

    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// The instant the current state began; the key `getJobs` pages order by.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state().occurred_at()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// How many times this job has entered `FAILED`, used by the default
    /// retry filter's `maxRetries` check (§4.6).
    pub fn failed_count(&self) -> usize {
        self.history.iter().filter(|s| s.name() == StateName::Failed).count()
    }

    /// Append a new state and bump `version` by exactly one (invariant 2,
    /// §3). This is the only way to grow `history`; callers never mutate it
    /// directly, so `history(v1)` is always a prefix of `history(v2)` for
    /// `v1 < v2` (§8). Local bookkeeping only — does not move `base_version`,
    /// so a `StorageProvider` can still tell how many versions this job's
    /// history is actually ahead of what's stored (see `base_version`).
    pub fn transition(&mut self, next: JobState) {
        self.history.push(next);
        self.version += 1;
    }

    /// Build a copy with `next` appended, leaving `self` untouched. Used by
    /// filters (§4.6) that propose a next state without yet committing it.
    pub fn with_transition(&self, next: JobState) -> Self {
        let mut copy = self.clone();
        copy.transition(next);
        copy
    }

    /// The version this job's history is based on — the baseline a
    /// `StorageProvider` checks a save against (§4.1). Unlike `version`,
    /// never advanced by `transition`, only by `mark_persisted`.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Called by a `StorageProvider` once a save is accepted: stamps the
    /// real persisted version onto this job and resyncs `base_version` to
    /// match, regardless of how many states were appended locally before
    /// the save (invariant 2, §8 — exactly one version bump per persisted
    /// mutation, independent of `on_state_election` chaining further
    /// transitions on top of the caller's own).
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
        self.base_version = version;
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            job_signature: String = "test-signature",
        }
        set {
            id: JobId = JobId::new(),
            job_details: JobDetails = JobDetails::new("test.Class", "run"),
            version: u64 = 0,
            metadata: HashMap<String, String> = HashMap::new(),
            history: Vec<JobState> = vec![JobState::Scheduled { scheduled_at: Utc::now(), reason: None }],
        }
        option {
            recurring_job_id: String = None,
        }
        computed {
            base_version: u64 = self.version,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
