// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_core::FakeClock;
use parking_lot::Mutex as PMutex;

struct RecordingStatsListener {
    seen: Arc<PMutex<Vec<JobStats>>>,
}

impl JobStatsChangeListener for RecordingStatsListener {
    fn on_change(&self, stats: &JobStats) {
        self.seen.lock().push(*stats);
    }
}

struct StubSource {
    stats: JobStats,
}

impl ChangeSource for StubSource {
    fn snapshot_stats(&self) -> JobStats {
        self.stats
    }
    fn snapshot_job(&self, _id: JobId) -> Option<Job> {
        None
    }
    fn snapshot_servers(&self) -> Vec<BackgroundJobServerStatus> {
        Vec::new()
    }
}

#[tokio::test]
async fn stats_notification_respects_rate_limit() {
    let clock: Arc<dyn bgjob_core::Clock> = Arc::new(FakeClock::new());
    let dispatcher = Arc::new(ChangeListenerDispatcher::new(clock, 5.0));
    let source: Arc<dyn ChangeSource> =
        Arc::new(StubSource { stats: JobStats { enqueued: 3, ..Default::default() } });
    let seen = Arc::new(PMutex::new(Vec::new()));
    dispatcher.stats_listeners.lock().push(Box::new(RecordingStatsListener { seen: seen.clone() }));

    dispatcher.tick(source.as_ref());
    dispatcher.tick(source.as_ref());

    // Both ticks land within the same refill window (burst of 5), so both succeed.
    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn removing_last_job_listener_stops_tracking_it() {
    let clock: Arc<dyn bgjob_core::Clock> = Arc::new(FakeClock::new());
    let dispatcher = ChangeListenerDispatcher::new(clock, 5.0);
    let job_id = JobId::new();
    dispatcher.job_listeners.lock().insert(job_id, Vec::new());
    dispatcher.remove_job_listener(job_id);
    assert!(!dispatcher.job_listeners.lock().contains_key(&job_id));
}
