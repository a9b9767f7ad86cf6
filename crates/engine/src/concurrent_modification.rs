// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ConcurrentJobModificationResolver` (§4.7): decides, per conflicting
//! (local, remote) pair reported by `save`, whether to retry, drop, or
//! escalate.

use bgjob_core::{JobConflict, JobState};

/// What to do with one conflicting pair after a failed batch `save` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The local write is safe to re-apply after refreshing `version`.
    Allow,
    /// Drop the local write; the remote state invalidates our decision.
    RetryTick,
    /// The conflict indicates corruption or a bug; propagate as fatal.
    Fatal,
}

pub trait ConcurrentJobModificationResolver: Send + Sync {
    fn resolve(&self, conflict: &JobConflict) -> Resolution;
}

fn is_heartbeat_only(conflict: &JobConflict) -> bool {
    matches!(
        (conflict.local.state(), conflict.remote.state()),
        (JobState::Processing { .. }, JobState::Processing { .. })
    )
}

fn is_deletion(conflict: &JobConflict) -> bool {
    matches!(conflict.local.state(), JobState::Deleted { .. })
}

/// A heartbeat refresh racing a worker that just finished the same job: the
/// local write is only a `PROCESSING` timestamp bump, and the remote side
/// already reached a terminal state because the worker's own save landed
/// first (`worker_pool::WorkerPool::submit` removes from
/// `currently_processed` only after that save completes, so the coordinator
/// can still snapshot the job for one more heartbeat). Not a conflict worth
/// escalating — the job is already done.
fn is_stale_heartbeat(conflict: &JobConflict) -> bool {
    matches!(conflict.local.state(), JobState::Processing { .. }) && conflict.remote.is_terminal()
}

/// The default policy (§4.7):
/// - Heartbeats (both sides `PROCESSING`) and local deletions are always allowed.
/// - A heartbeat racing a worker's own terminal save is dropped and the tick
///   retries — the job already finished, there is nothing left to resolve.
/// - If the remote side already reached `DELETED` (e.g. the user deleted a
///   job the coordinator was about to enqueue), drop the local write and
///   retry the tick — a legitimate race, not a bug.
/// - If the remote side already reached `SUCCEEDED` but the local write is
///   not itself terminal, that is a regression (e.g. re-enqueuing a job that
///   already succeeded) and is fatal.
/// - Any other remote advancement past the local version retries the tick;
///   anything else is treated as fatal.
pub struct DefaultConcurrentJobModificationResolver;

impl ConcurrentJobModificationResolver for DefaultConcurrentJobModificationResolver {
    fn resolve(&self, conflict: &JobConflict) -> Resolution {
        if is_heartbeat_only(conflict) || is_deletion(conflict) {
            return Resolution::Allow;
        }
        if is_stale_heartbeat(conflict) {
            return Resolution::RetryTick;
        }
        match conflict.remote.state() {
            JobState::Deleted { .. } => Resolution::RetryTick,
            JobState::Succeeded { .. } if !conflict.local.is_terminal() => Resolution::Fatal,
            _ if conflict.remote.version > conflict.local.version => Resolution::RetryTick,
            _ => Resolution::Fatal,
        }
    }
}

#[cfg(test)]
#[path = "concurrent_modification_tests.rs"]
mod tests;
