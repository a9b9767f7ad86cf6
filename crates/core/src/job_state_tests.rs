// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
}

#[test]
fn scheduled_round_trips_through_json() {
    let state = JobState::Scheduled { scheduled_at: now(), reason: Some("retry".to_string()) };
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["@class"], "SCHEDULED");
    let back: JobState = serde_json::from_value(json).unwrap();
    assert_eq!(back, state);
}

#[test]
fn succeeded_duration_round_trips_in_milliseconds() {
    let state = JobState::Succeeded { succeeded_at: now(), duration: Duration::milliseconds(1234) };
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["duration"], 1234);
    let back: JobState = serde_json::from_value(json).unwrap();
    assert_eq!(back, state);
}

#[test]
fn name_maps_each_variant() {
    assert_eq!(JobState::scheduled_at(now()).name(), StateName::Scheduled);
    assert_eq!(JobState::enqueued_at(now()).name(), StateName::Enqueued);
    assert_eq!(
        JobState::Processing { started_at: now(), updated_at: now(), server_id: ServerId::new() }
            .name(),
        StateName::Processing
    );
}

#[test]
fn only_succeeded_and_deleted_are_terminal() {
    assert!(!JobState::scheduled_at(now()).is_terminal());
    assert!(!JobState::enqueued_at(now()).is_terminal());
    assert!(JobState::Succeeded { succeeded_at: now(), duration: Duration::zero() }.is_terminal());
    assert!(JobState::Deleted { deleted_at: now(), reason: "x".into() }.is_terminal());
}
