// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::concurrent_modification::DefaultConcurrentJobModificationResolver;
use crate::job_activator::DispatchTableActivator;
use crate::work_distribution::FixedWorkDistributionStrategy;
use bgjob_core::{FakeClock, JobDetails};
use bgjob_storage::InMemoryStorageProvider;
use std::time::Duration;

fn server(storage: Arc<dyn StorageProvider>, clock: Arc<dyn Clock>) -> BackgroundJobServer {
    let config = BackgroundJobServerConfiguration::builder()
        .poll_interval(Duration::from_secs(5))
        .worker_pool_size(2)
        .build();
    BackgroundJobServer::new(
        storage,
        clock,
        config,
        Vec::new(),
        Arc::new(DefaultConcurrentJobModificationResolver),
        Arc::new(FixedWorkDistributionStrategy::default()),
        Arc::new(DispatchTableActivator::new()),
    )
}

#[tokio::test]
async fn start_announces_the_server_and_marks_it_running() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let storage: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageProvider::new(clock.clone()));
    let srv = server(storage.clone(), clock);

    srv.start().await;

    let servers = storage.get_background_job_servers().await;
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].id, srv.id());
    assert!(servers[0].running);

    srv.stop().await;
}

#[tokio::test]
async fn starting_twice_does_not_announce_a_second_time() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let storage: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageProvider::new(clock.clone()));
    let srv = server(storage.clone(), clock);

    srv.start().await;
    srv.start().await;

    assert_eq!(storage.get_background_job_servers().await.len(), 1);
    srv.stop().await;
}

#[tokio::test]
async fn stop_before_start_is_a_noop() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let storage: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageProvider::new(clock.clone()));
    let srv = server(storage, clock);

    srv.stop().await;
}

#[tokio::test]
async fn scheduler_enqueues_against_the_servers_own_storage() {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let storage: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageProvider::new(clock.clone()));
    let srv = server(storage.clone(), clock);

    let job = srv.scheduler().enqueue(JobDetails::new("emails", "send")).await.unwrap();

    let reloaded = storage.get_job_by_id(job.id).await.unwrap();
    assert_eq!(reloaded.id, job.id);
}
