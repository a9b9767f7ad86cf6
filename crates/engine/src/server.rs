// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BackgroundJobServer` (§2.1, §5): owns the worker pool and the
//! coordinator, announces its liveness, and drives the tick/heartbeat/idle
//! loops described in §4.2, §4.5, §4.9.

use crate::capacity_monitor::ServerCapacityMonitor;
use crate::concurrent_modification::ConcurrentJobModificationResolver;
use crate::config::BackgroundJobServerConfiguration;
use crate::coordinator::JobZooKeeper;
use crate::job_activator::JobActivator;
use crate::job_filters::JobFilter;
use crate::master_election::is_master;
use crate::scheduler::JobScheduler;
use crate::work_distribution::WorkDistributionStrategy;
use crate::worker_pool::WorkerPool;
use bgjob_core::Clock;
use bgjob_storage::{BackgroundJobServerId, BackgroundJobServerStatus, StorageProvider};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

/// How often the server heartbeats its own liveness record (§5: "one server
/// heartbeat timer thread"), independent of the tick cadence.
const HEARTBEAT_INTERVAL: StdDuration = StdDuration::from_secs(5);

/// Bound on how long `stop()` waits for in-flight jobs to finish before
/// giving up on a graceful drain (§5 "Cancellation" step iii).
const SHUTDOWN_GRACE_PERIOD: StdDuration = StdDuration::from_secs(10);

/// One server instance: a bounded worker pool, a coordinator tick loop, a
/// liveness heartbeat, and an idle-driven opportunistic pull (§4.5).
///
/// Owns the coordinator outright rather than the cyclic handle arrangement
/// sketched in §9 ("`Server` owns everything, `Coordinator` holds a
/// non-owning handle to `Server`") — this port's coordinator never calls
/// back into the server, so plain ownership already avoids the cycle (see
/// `DESIGN.md`).
pub struct BackgroundJobServer {
    id: BackgroundJobServerId,
    storage: Arc<dyn StorageProvider>,
    clock: Arc<dyn Clock>,
    config: BackgroundJobServerConfiguration,
    coordinator: Arc<JobZooKeeper>,
    worker_pool: Arc<WorkerPool>,
    running: Arc<AtomicBool>,
    capacity_monitor: Arc<ServerCapacityMonitor>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

#[allow(clippy::too_many_arguments)]
impl BackgroundJobServer {
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn Clock>,
        config: BackgroundJobServerConfiguration,
        filters: Vec<Arc<dyn JobFilter>>,
        resolver: Arc<dyn ConcurrentJobModificationResolver>,
        work_distribution: Arc<dyn WorkDistributionStrategy>,
        activator: Arc<dyn JobActivator>,
    ) -> Self {
        let id = BackgroundJobServerId::new();
        let (worker_pool, idle_rx) = WorkerPool::new(config.worker_pool_size);
        let worker_pool = Arc::new(worker_pool);
        let running = Arc::new(AtomicBool::new(false));
        let coordinator = Arc::new(JobZooKeeper::new(
            id,
            storage.clone(),
            clock.clone(),
            config.clone(),
            filters,
            resolver,
            work_distribution,
            activator,
            worker_pool.clone(),
            running.clone(),
        ));
        let mut server = Self {
            id,
            storage,
            clock,
            config,
            coordinator,
            worker_pool,
            running,
            capacity_monitor: Arc::new(ServerCapacityMonitor::new()),
            tasks: Mutex::new(Vec::new()),
        };
        server.spawn_idle_listener(idle_rx);
        server
    }

    pub fn id(&self) -> BackgroundJobServerId {
        self.id
    }

    /// A thin façade over this server's storage and clock for application
    /// code to enqueue/schedule work (§2.1).
    pub fn scheduler(&self) -> JobScheduler {
        JobScheduler::new(self.storage.clone(), self.clock.clone())
    }

    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.worker_pool
    }

    fn spawn_idle_listener(&mut self, mut idle_rx: tokio::sync::mpsc::UnboundedReceiver<()>) {
        let coordinator = self.coordinator.clone();
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            while idle_rx.recv().await.is_some() {
                if !running.load(Ordering::Acquire) {
                    continue;
                }
                if let Err(err) = coordinator.pull_enqueued_work().await {
                    tracing::warn!(error = %err, "opportunistic pull failed");
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Announce this server, then start the tick loop and the heartbeat loop
    /// (§4.2, §5). Idempotent: calling `start` twice while already running
    /// is a no-op.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let now = self.clock.now();
        let status = BackgroundJobServerStatus::new(
            self.id,
            self.config.worker_pool_size,
            self.config.poll_interval.as_secs(),
            now,
        )
        .with_capacity_metrics(self.capacity_monitor.sample());
        self.storage.announce_background_job_server(status).await;
        self.coordinator.mark_initialized();
        tracing::info!(server_id = %self.id, "background job server started");

        self.spawn_tick_loop();
        self.spawn_heartbeat_loop();
    }

    fn spawn_tick_loop(&self) {
        let coordinator = self.coordinator.clone();
        let storage = self.storage.clone();
        let clock = self.clock.clone();
        let running = self.running.clone();
        let id = self.id;
        let poll_interval = self.config.poll_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let roster = storage.get_background_job_servers().await;
                let master = is_master(&roster, id, clock.now());
                if let Err(err) = coordinator.tick(master).await {
                    tracing::error!(server_id = %id, error = %err, "background job server stopping");
                    running.store(false, Ordering::Release);
                    break;
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    fn spawn_heartbeat_loop(&self) {
        let storage = self.storage.clone();
        let clock = self.clock.clone();
        let running = self.running.clone();
        let capacity_monitor = self.capacity_monitor.clone();
        let id = self.id;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                interval.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let metrics = capacity_monitor.sample();
                if let Err(err) = storage.signal_background_job_server_alive(id, clock.now(), metrics).await {
                    tracing::warn!(server_id = %id, error = %err, "failed to heartbeat server liveness");
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Graceful shutdown (§5 "Cancellation"): stop issuing ticks, drain the
    /// worker pool with a bounded grace period, then abort whatever tasks
    /// remain. Jobs still `PROCESSING` past the grace period are left as-is;
    /// the next master tick elsewhere in the fleet detects them as orphaned.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::info!(server_id = %self.id, "background job server stopping");

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE_PERIOD;
        while !self.worker_pool.currently_processed().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(StdDuration::from_millis(50)).await;
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
