// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::demo_jobs::DEMO_CLASS;
use crate::exit_error::ExitError;
use bgjob_core::{JobDetails, JobParameter};
use bgjob_engine::JobScheduler;

/// `bgjob enqueue <job-name> [--arg k=v]*` (§6.1).
pub async fn run(
    scheduler: &JobScheduler,
    job_name: &str,
    args: Vec<(String, String)>,
) -> Result<(), ExitError> {
    let mut job_details = JobDetails::new(DEMO_CLASS, job_name);
    if !args.is_empty() {
        let map: serde_json::Map<String, serde_json::Value> =
            args.into_iter().map(|(k, v)| (k, serde_json::Value::String(v))).collect();
        job_details = job_details.with_params(vec![JobParameter::new("Map", serde_json::Value::Object(map))]);
    }

    let job = scheduler.enqueue(job_details).await.map_err(|err| ExitError::new(1, err.to_string()))?;
    println!("enqueued {} ({}::{})", crate::color::header(&job.id.to_string()), DEMO_CLASS, job_name);
    Ok(())
}
