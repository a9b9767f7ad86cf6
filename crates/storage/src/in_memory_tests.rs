// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_core::{FakeClock, JobDetails, JobState};

fn provider() -> InMemoryStorageProvider {
    InMemoryStorageProvider::new(Arc::new(FakeClock::new()))
}

fn enqueued_job(now: DateTime<Utc>) -> Job {
    Job::new(JobDetails::new("emails", "send_welcome"), JobState::enqueued_at(now))
}

#[tokio::test]
async fn save_then_get_round_trips() {
    let storage = provider();
    let job = enqueued_job(Utc::now());
    let saved = storage.save(job.clone()).await.unwrap();
    let fetched = storage.get_job_by_id(saved.id).await.unwrap();
    assert_eq!(fetched.id, job.id);
}

#[tokio::test]
async fn save_with_stale_version_fails_with_conflict() {
    let storage = provider();
    let job = storage.save(enqueued_job(Utc::now())).await.unwrap();

    let mut stale = job.clone();
    stale.transition(JobState::Processing {
        started_at: Utc::now(),
        updated_at: Utc::now(),
        server_id: bgjob_core::ServerId::new(),
    });
    // Advance the canonical copy past `stale` so `stale`'s version is behind.
    let mut newer = job.clone();
    newer.transition(JobState::Processing {
        started_at: Utc::now(),
        updated_at: Utc::now(),
        server_id: bgjob_core::ServerId::new(),
    });
    storage.save(newer).await.unwrap();

    let err = storage.save(stale).await.unwrap_err();
    assert!(matches!(err, StorageError::ConcurrentJobModification { .. }));
}

#[tokio::test]
async fn a_save_with_two_locally_chained_transitions_still_bumps_version_by_one() {
    // Mirrors §4.6: `onStateElection` can append a second state (e.g. a retry
    // filter scheduling a retry) on top of one the caller already chose,
    // without that counting as two mutations against the stored version.
    let storage = provider();
    let saved = storage.save(enqueued_job(Utc::now())).await.unwrap();
    assert_eq!(saved.version, 0);

    let mut candidate = saved.clone();
    candidate.transition(JobState::Processing {
        started_at: Utc::now(),
        updated_at: Utc::now(),
        server_id: bgjob_core::ServerId::new(),
    });
    candidate.transition(JobState::Failed {
        failed_at: Utc::now(),
        exception_class: "Boom".to_string(),
        message: "boom".to_string(),
        stacktrace: String::new(),
    });
    assert_eq!(candidate.version, 2);
    assert_eq!(candidate.base_version(), 0);

    let persisted = storage.save(candidate).await.unwrap();
    assert_eq!(persisted.version, 1);
    assert_eq!(persisted.base_version(), 1);
    assert!(matches!(persisted.state(), JobState::Failed { .. }));

    let reloaded = storage.get_job_by_id(saved.id).await.unwrap();
    assert_eq!(reloaded.version, 1);
}

#[tokio::test]
async fn get_job_by_id_reports_not_found() {
    let storage = provider();
    let err = storage.get_job_by_id(JobId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::JobNotFound(_)));
}

#[tokio::test]
async fn get_jobs_orders_by_updated_at_ascending() {
    let storage = provider();
    let base = Utc::now();
    let later = storage.save(enqueued_job(base + chrono::Duration::seconds(5))).await.unwrap();
    let earlier = storage.save(enqueued_job(base)).await.unwrap();

    let page = storage.get_jobs(StateName::Enqueued, PageRequest::first(10)).await;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, earlier.id);
    assert_eq!(page[1].id, later.id);
}

#[tokio::test]
async fn page_request_bounds_the_result() {
    let storage = provider();
    let base = Utc::now();
    for i in 0..5 {
        storage
            .save(enqueued_job(base + chrono::Duration::seconds(i)))
            .await
            .unwrap();
    }
    let page = storage.get_jobs(StateName::Enqueued, PageRequest::new(1, 2)).await;
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn delete_jobs_removes_only_matching_state_and_age() {
    let storage = provider();
    let now = Utc::now();
    let old = storage.save(enqueued_job(now - chrono::Duration::hours(1))).await.unwrap();
    let recent = storage.save(enqueued_job(now)).await.unwrap();

    let deleted = storage.delete_jobs(StateName::Enqueued, now - chrono::Duration::minutes(30)).await;
    assert_eq!(deleted, 1);
    assert!(storage.get_job_by_id(old.id).await.is_err());
    assert!(storage.get_job_by_id(recent.id).await.is_ok());
}

#[tokio::test]
async fn exists_matches_on_signature_and_state() {
    let storage = provider();
    let details = JobDetails::new("reports", "nightly");
    storage.save(Job::new(details.clone(), JobState::enqueued_at(Utc::now()))).await.unwrap();

    assert!(storage.exists(&details, StateName::Enqueued).await);
    assert!(!storage.exists(&details, StateName::Processing).await);
}

#[tokio::test]
async fn publish_job_stat_counter_accumulates() {
    let storage = provider();
    storage.publish_job_stat_counter(StateName::Succeeded, 3).await;
    storage.publish_job_stat_counter(StateName::Succeeded, 2).await;
    assert_eq!(storage.get_job_stats().await.succeeded_lifetime, 5);
}

#[tokio::test]
async fn background_job_server_timeout_removal() {
    let storage = provider();
    let now = Utc::now();
    let status =
        BackgroundJobServerStatus::new(BackgroundJobServerId::new(), 4, 15, now - chrono::Duration::minutes(10));
    storage.announce_background_job_server(status).await;

    let removed = storage.remove_timed_out_background_job_servers(now - chrono::Duration::minutes(1)).await;
    assert_eq!(removed, 1);
    assert!(storage.get_background_job_servers().await.is_empty());
}
