// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cron::CronExpression;
use crate::job_details::JobDetails;

#[test]
fn derived_id_matches_job_signature() {
    let details = JobDetails::new("reports", "nightly_rollup");
    assert_eq!(RecurringJob::derive_id(&details), details.signature());
}

#[test]
fn round_trips_through_json_with_named_zone() {
    let job = RecurringJob::new(
        "nightly-rollup",
        JobDetails::new("reports", "nightly_rollup"),
        CronExpression::parse("0 0 3 * * *").unwrap(),
        chrono_tz::America::Los_Angeles,
    );
    let json = serde_json::to_value(&job).unwrap();
    assert_eq!(json["zone_id"], "America/Los_Angeles");
    let back: RecurringJob = serde_json::from_value(json).unwrap();
    assert_eq!(back.id, job.id);
    assert_eq!(back.zone_id, job.zone_id);
}
