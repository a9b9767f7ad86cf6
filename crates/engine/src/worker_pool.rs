// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool (§4.5, §5): `workerPoolSize` tokio tasks executing jobs,
//! plus `currentlyProcessedJobs`, the concurrent-safe map the coordinator
//! heartbeats from a different task.

use bgjob_core::{Job, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

/// The set of jobs currently executing, touched by worker tasks (insert on
/// start, remove on finish) and iterated by the coordinator for heartbeats
/// (§5 "Shared mutable state"). A `parking_lot::Mutex` over a map gives
/// snapshot-safe iteration under concurrent add/remove.
#[derive(Clone, Default)]
pub struct CurrentlyProcessedJobs {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl CurrentlyProcessedJobs {
    pub fn insert(&self, job: Job) {
        self.jobs.lock().insert(job.id, job);
    }

    pub fn remove(&self, job_id: JobId) {
        self.jobs.lock().remove(&job_id);
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds how many job bodies run concurrently on a server (§5 "Scheduling
/// model": `workerPoolSize` worker threads). `notify_idle` fires on the
/// returned receiver each time a worker completes, giving the coordinator's
/// idle callback (§4.5) its opportunistic-pull trigger.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    pool_size: usize,
    in_flight: Arc<AtomicUsize>,
    currently_processed: CurrentlyProcessedJobs,
    idle_tx: mpsc::UnboundedSender<()>,
}

impl WorkerPool {
    pub fn new(pool_size: usize) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        (
            Self {
                semaphore: Arc::new(Semaphore::new(pool_size)),
                pool_size,
                in_flight: Arc::new(AtomicUsize::new(0)),
                currently_processed: CurrentlyProcessedJobs::default(),
                idle_tx,
            },
            idle_rx,
        )
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_capacity(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn currently_processed(&self) -> &CurrentlyProcessedJobs {
        &self.currently_processed
    }

    /// Submit `job` for execution; `run` performs the actual work (§4.5.1)
    /// and is only invoked once a permit is available. Returns immediately;
    /// the returned handle may be ignored (fire-and-forget) or awaited.
    pub fn submit<F, Fut>(&self, job: Job, run: F) -> JoinHandle<()>
    where
        F: FnOnce(Job) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let in_flight = self.in_flight.clone();
        let currently_processed = self.currently_processed.clone();
        let idle_tx = self.idle_tx.clone();
        let job_id = job.id;
        currently_processed.insert(job.clone());
        in_flight.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let Ok(permit) = semaphore.acquire_owned().await else {
                // The semaphore is only closed when the pool itself is dropped.
                currently_processed.remove(job_id);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                return;
            };
            run(job).await;
            drop(permit);
            currently_processed.remove(job_id);
            in_flight.fetch_sub(1, Ordering::SeqCst);
            let _ = idle_tx.send(());
        })
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
