// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state machine (§3). A `JobState` is an immutable record; `Job::history`
//! is an ordered, append-only sequence of them.

use crate::id::define_uuid_id;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Identity of the `BackgroundJobServer` that owns a `PROCESSING` job.
    pub struct ServerId;
}

/// One state a job has occupied. Internally tagged on `@class` to match the
/// stable wire representation in §6 ("history:[{ @class:<StateName>, ... }]").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum JobState {
    #[serde(rename = "SCHEDULED")]
    Scheduled {
        scheduled_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "ENQUEUED")]
    Enqueued { enqueued_at: DateTime<Utc> },
    #[serde(rename = "PROCESSING")]
    Processing { started_at: DateTime<Utc>, updated_at: DateTime<Utc>, server_id: ServerId },
    #[serde(rename = "SUCCEEDED")]
    Succeeded {
        succeeded_at: DateTime<Utc>,
        #[serde(with = "duration_millis")]
        duration: Duration,
    },
    #[serde(rename = "FAILED")]
    Failed {
        failed_at: DateTime<Utc>,
        exception_class: String,
        message: String,
        stacktrace: String,
    },
    #[serde(rename = "DELETED")]
    Deleted { deleted_at: DateTime<Utc>, reason: String },
}

/// Tag-only variant of [`JobState`], used for filtering (`getJobs(state, ..)`)
/// without constructing a full state. Mirrors the teacher's `StepStatusKind`
/// pattern of stripping associated data from a data-carrying enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateName {
    Scheduled,
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Deleted,
}

crate::simple_display! {
    StateName {
        Scheduled => "SCHEDULED",
        Enqueued => "ENQUEUED",
        Processing => "PROCESSING",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
        Deleted => "DELETED",
    }
}

impl JobState {
    pub fn name(&self) -> StateName {
        match self {
            JobState::Scheduled { .. } => StateName::Scheduled,
            JobState::Enqueued { .. } => StateName::Enqueued,
            JobState::Processing { .. } => StateName::Processing,
            JobState::Succeeded { .. } => StateName::Succeeded,
            JobState::Failed { .. } => StateName::Failed,
            JobState::Deleted { .. } => StateName::Deleted,
        }
    }

    /// The instant this state began, used for `updatedAt`-ordered page queries.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JobState::Scheduled { scheduled_at, .. } => *scheduled_at,
            JobState::Enqueued { enqueued_at } => *enqueued_at,
            JobState::Processing { updated_at, .. } => *updated_at,
            JobState::Succeeded { succeeded_at, .. } => *succeeded_at,
            JobState::Failed { failed_at, .. } => *failed_at,
            JobState::Deleted { deleted_at, .. } => *deleted_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Deleted { .. })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn scheduled_at(now: DateTime<Utc>) -> Self {
        JobState::Scheduled { scheduled_at: now, reason: None }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn enqueued_at(now: DateTime<Utc>) -> Self {
        JobState::Enqueued { enqueued_at: now }
    }
}

/// `chrono::Duration` has no serde impl upstream; store milliseconds.
mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(d)?;
        Ok(Duration::milliseconds(ms))
    }
}

#[cfg(test)]
#[path = "job_state_tests.rs"]
mod tests;
