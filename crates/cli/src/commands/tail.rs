// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use bgjob_core::JobId;
use bgjob_storage::StorageProvider;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `bgjob tail <job-id>` — polls `getJobById` until a terminal state,
/// printing each history transition as it is observed (§6.1).
pub async fn run(storage: &Arc<dyn StorageProvider>, job_id: &str) -> Result<(), ExitError> {
    let id = JobId::from_str(job_id).map_err(|err| ExitError::new(2, format!("invalid job id `{job_id}`: {err}")))?;
    let mut printed = 0usize;

    loop {
        let job = storage.get_job_by_id(id).await.map_err(|err| ExitError::new(1, err.to_string()))?;
        for state in job.history().iter().skip(printed) {
            println!("{} @ {}", state.name(), state.occurred_at().to_rfc3339());
        }
        printed = job.history().len();
        if job.is_terminal() {
            return Ok(());
        }

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = &mut ctrl_c => return Ok(()),
        }
    }
}
