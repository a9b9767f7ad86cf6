// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::demo_jobs::DEMO_CLASS;
use crate::exit_error::ExitError;
use bgjob_core::{CronExpression, JobDetails};
use bgjob_engine::JobScheduler;
use std::str::FromStr;

/// `bgjob schedule-recurring <id> <job-name> <cron> [--zone <iana>]` (§6.1).
pub async fn run(
    scheduler: &JobScheduler,
    id: &str,
    job_name: &str,
    cron: &str,
    zone: &str,
) -> Result<(), ExitError> {
    let cron_expression = CronExpression::parse(cron).map_err(|err| ExitError::new(2, err.to_string()))?;
    let zone_id = chrono_tz::Tz::from_str(zone)
        .map_err(|err| ExitError::new(2, format!("invalid time zone `{zone}`: {err}")))?;

    let job_details = JobDetails::new(DEMO_CLASS, job_name);
    let recurring = scheduler.schedule_recurring(id, job_details, cron_expression, zone_id).await;
    println!(
        "registered recurring job {} ({}::{}) on `{}` [{}]",
        crate::color::header(&recurring.id),
        DEMO_CLASS,
        job_name,
        cron,
        zone
    );
    Ok(())
}
