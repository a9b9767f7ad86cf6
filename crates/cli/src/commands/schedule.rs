// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::demo_jobs::DEMO_CLASS;
use crate::exit_error::ExitError;
use bgjob_core::JobDetails;
use bgjob_engine::JobScheduler;
use chrono::{DateTime, Utc};

/// `bgjob schedule <job-name> --at <rfc3339>` (§6.1).
pub async fn run(scheduler: &JobScheduler, job_name: &str, at: DateTime<Utc>) -> Result<(), ExitError> {
    let job_details = JobDetails::new(DEMO_CLASS, job_name);
    let job = scheduler.schedule(job_details, at).await.map_err(|err| ExitError::new(1, err.to_string()))?;
    println!(
        "scheduled {} ({}::{}) for {}",
        crate::color::header(&job.id.to_string()),
        DEMO_CLASS,
        job_name,
        at.to_rfc3339()
    );
    Ok(())
}
