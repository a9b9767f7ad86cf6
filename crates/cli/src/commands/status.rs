// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use bgjob_storage::StorageProvider;
use std::sync::Arc;

/// `bgjob status` — prints `JobStats` (§6.1, §4.8).
pub async fn run(storage: &Arc<dyn StorageProvider>) {
    let stats = storage.get_job_stats().await;
    println!("{}", crate::color::header("job stats"));
    println!("  scheduled:   {}", stats.scheduled);
    println!("  enqueued:    {}", stats.enqueued);
    println!("  processing:  {}", stats.processing);
    println!("  succeeded:   {} (lifetime {})", stats.succeeded, stats.succeeded_lifetime);
    println!("  failed:      {}", stats.failed);
    println!("  deleted:     {}", stats.deleted);
    println!("  recurring jobs:         {}", stats.recurring_jobs);
    println!("  background job servers: {}", stats.background_job_servers);
}
