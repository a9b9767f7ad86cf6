// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_core::JobBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn submit_runs_the_job_and_clears_it_on_completion() {
    let (pool, mut idle_rx) = WorkerPool::new(4);
    let job = JobBuilder::default().build();
    let job_id = job.id;
    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = ran.clone();

    pool.submit(job, move |_job| {
        let ran = ran_clone.clone();
        async move {
            ran.fetch_add(1, Ordering::SeqCst);
        }
    })
    .await
    .unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(pool.currently_processed().snapshot().iter().all(|j| j.id != job_id));
    assert_eq!(pool.free_capacity(), pool.pool_size());
    idle_rx.recv().await.unwrap();
}

#[tokio::test]
async fn free_capacity_tracks_in_flight_jobs() {
    let (pool, _idle_rx) = WorkerPool::new(2);
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);

    let job_a = JobBuilder::default().build();
    let job_b = JobBuilder::default().build();

    let mut rx_a = release_rx.clone();
    pool.submit(job_a, move |_job| async move {
        let _ = rx_a.wait_for(|ready| *ready).await;
    });
    let mut rx_b = release_rx.clone();
    pool.submit(job_b, move |_job| async move {
        let _ = rx_b.wait_for(|ready| *ready).await;
    });

    // Give both spawned tasks a chance to acquire their permits before asserting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.free_capacity(), 0);
    assert_eq!(pool.currently_processed().len(), 2);

    release_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.free_capacity(), 2);
    assert!(pool.currently_processed().is_empty());
}

#[tokio::test]
async fn a_third_submission_waits_for_a_free_permit() {
    let (pool, _idle_rx) = WorkerPool::new(1);
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut rx_first = release_rx.clone();
    let order_first = order.clone();
    pool.submit(JobBuilder::default().build(), move |_job| async move {
        let _ = rx_first.wait_for(|ready| *ready).await;
        order_first.lock().push(1);
    });

    let order_second = order.clone();
    let handle_second = pool.submit(JobBuilder::default().build(), move |_job| async move {
        order_second.lock().push(2);
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.free_capacity(), 0);

    release_tx.send(true).unwrap();
    handle_second.await.unwrap();

    assert_eq!(*order.lock(), vec![1, 2]);
}

#[tokio::test]
async fn idle_channel_fires_once_per_completed_job() {
    let (pool, mut idle_rx) = WorkerPool::new(2);
    pool.submit(JobBuilder::default().build(), |_job| async {}).await.unwrap();
    pool.submit(JobBuilder::default().build(), |_job| async {}).await.unwrap();

    idle_rx.recv().await.unwrap();
    idle_rx.recv().await.unwrap();
}
