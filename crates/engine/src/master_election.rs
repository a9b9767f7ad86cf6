// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master election (§4.9): elementary leader election by earliest
//! announcement among currently-live servers.

use bgjob_storage::BackgroundJobServerStatus;
use chrono::{DateTime, Utc};

/// Among `roster`, the server that is live at `now` (§4.9: `lastHeartbeat`
/// within `4 × pollIntervalSeconds`) with the smallest `firstHeartbeat`,
/// ties broken by `id` ordering. `None` if no server in `roster` is live.
pub fn elect_master(roster: &[BackgroundJobServerStatus], now: DateTime<Utc>) -> Option<&BackgroundJobServerStatus> {
    roster
        .iter()
        .filter(|status| status.is_live(now))
        .min_by_key(|status| (status.first_heartbeat, status.id))
}

pub fn is_master(roster: &[BackgroundJobServerStatus], candidate_id: bgjob_storage::BackgroundJobServerId, now: DateTime<Utc>) -> bool {
    elect_master(roster, now).map(|master| master.id) == Some(candidate_id)
}

#[cfg(test)]
#[path = "master_election_tests.rs"]
mod tests;
