// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_core::{FakeClock, JobDetails};

fn failed_job(clock: &FakeClock, exception_class: &str) -> Job {
    let mut job = Job::new(JobDetails::new("emails", "send"), JobState::enqueued_at(clock.now()));
    job.transition(JobState::Processing {
        started_at: clock.now(),
        updated_at: clock.now(),
        server_id: bgjob_core::ServerId::new(),
    });
    job.transition(JobState::Failed {
        failed_at: clock.now(),
        exception_class: exception_class.to_string(),
        message: "boom".to_string(),
        stacktrace: String::new(),
    });
    job
}

#[test]
fn schedules_a_retry_with_exponential_backoff() {
    let clock = FakeClock::new();
    let filter = DefaultRetryFilter::new(Arc::new(clock.clone()), 10).with_jitter_source(Arc::new(NoJitter));
    let mut job = failed_job(&clock, "widgets.BoomError");

    filter.on_state_election(&mut job);

    match job.state() {
        JobState::Scheduled { scheduled_at, .. } => {
            assert_eq!(*scheduled_at, clock.now() + chrono::Duration::seconds(3));
        }
        other => panic!("expected Scheduled, got {other:?}"),
    }
}

#[test]
fn does_not_retry_past_max_retries() {
    let clock = FakeClock::new();
    let filter = DefaultRetryFilter::new(Arc::new(clock.clone()), 0).with_jitter_source(Arc::new(NoJitter));
    let mut job = failed_job(&clock, "widgets.BoomError");

    filter.on_state_election(&mut job);

    assert!(matches!(job.state(), JobState::Failed { .. }));
}

#[test]
fn does_not_retry_job_class_not_found() {
    let clock = FakeClock::new();
    let filter = DefaultRetryFilter::new(Arc::new(clock.clone()), 10).with_jitter_source(Arc::new(NoJitter));
    let mut job = failed_job(&clock, "JobClassNotFound");

    filter.on_state_election(&mut job);

    assert!(matches!(job.state(), JobState::Failed { .. }));
}

#[test]
fn on_state_election_is_a_no_op_for_non_failed_states() {
    let clock = FakeClock::new();
    let filter = DefaultRetryFilter::new(Arc::new(clock.clone()), 10);
    let mut job = Job::new(JobDetails::new("emails", "send"), JobState::enqueued_at(clock.now()));
    let before = job.history().to_vec();

    filter.on_state_election(&mut job);

    assert_eq!(job.history(), before.as_slice());
}
