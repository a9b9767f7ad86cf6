// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_storage::BackgroundJobServerId;

fn server(first_heartbeat_offset_secs: i64, last_heartbeat_offset_secs: i64, now: DateTime<Utc>) -> BackgroundJobServerStatus {
    let mut status = BackgroundJobServerStatus::new(
        BackgroundJobServerId::new(),
        4,
        15,
        now + chrono::Duration::seconds(first_heartbeat_offset_secs),
    );
    status.last_heartbeat = now + chrono::Duration::seconds(last_heartbeat_offset_secs);
    status
}

#[test]
fn earliest_live_heartbeat_wins() {
    let now = Utc::now();
    let earlier = server(-100, 0, now);
    let later = server(-50, 0, now);
    let roster = vec![later.clone(), earlier.clone()];

    let master = elect_master(&roster, now).unwrap();
    assert_eq!(master.id, earlier.id);
}

#[test]
fn stale_servers_are_excluded() {
    let now = Utc::now();
    // last_heartbeat 100s ago with a 15s poll interval (60s liveness window) is stale.
    let stale = server(-200, -100, now);
    let roster = vec![stale];

    assert!(elect_master(&roster, now).is_none());
}

#[test]
fn ties_break_on_id_ordering() {
    let now = Utc::now();
    let mut a = server(-10, 0, now);
    let mut b = server(-10, 0, now);
    if a.id > b.id {
        std::mem::swap(&mut a, &mut b);
    }
    let roster = vec![b.clone(), a.clone()];

    let master = elect_master(&roster, now).unwrap();
    assert_eq!(master.id, a.id);
}

#[test]
fn is_master_reflects_election_result() {
    let now = Utc::now();
    let candidate = server(-10, 0, now);
    let other = server(-5, 0, now);
    let roster = vec![candidate.clone(), other.clone()];

    assert!(is_master(&roster, candidate.id, now));
    assert!(!is_master(&roster, other.id, now));
}
