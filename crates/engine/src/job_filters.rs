// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobFilter` (§4.6): user-pluggable hooks invoked around batch `save`.

use bgjob_core::{Clock, Job, JobState};
use std::sync::Arc;

/// A filter with two phases invoked during batch save (§4.6): `on_state_election`
/// sees the proposed new state before persistence and may mutate it further;
/// `on_state_applied` is purely observational, invoked after a successful save.
pub trait JobFilter: Send + Sync {
    fn on_state_election(&self, job: &mut Job) {
        let _ = job;
    }

    fn on_state_applied(&self, job: &Job) {
        let _ = job;
    }
}

/// Produces the jitter fraction applied to the default retry filter's
/// exponential backoff (§4.6). Exists as a seam so tests can assert exact
/// retry instants instead of a range.
pub trait JitterSource: Send + Sync {
    /// A value in `[-1.0, 1.0]` representing the jitter fraction of the
    /// ±20% band (so `1.0` means "+20%", `-1.0` means "-20%").
    fn sample(&self) -> f64;
}

/// Always applies zero jitter; deterministic for tests.
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn sample(&self) -> f64 {
        0.0
    }
}

/// Samples uniformly from `[-1.0, 1.0]` using the thread-local RNG.
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        // A tiny xorshift seeded from the wall clock; a job engine's retry
        // jitter has no correctness requirement on randomness quality, only
        // on avoiding synchronized thundering-herd retries (§4.6).
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x9E3779B9) as u64
            | 1;
        let mut x = seed;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        (x % 2001) as f64 / 1000.0 - 1.0
    }
}

/// The default retry filter (§4.6): exponential backoff with jitter.
///
/// When a job enters `FAILED`, if its lifetime `FAILED` count is within
/// `max_retries`, appends `SCHEDULED(now + 3^attempt seconds ± 20%)` during
/// `on_state_election`. Jobs whose `exceptionClass` names a non-retryable
/// kind (`JobClassNotFound`/`JobMethodNotFound`, §7) are left terminally
/// `FAILED` regardless of attempt count.
pub struct DefaultRetryFilter {
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
    max_retries: u32,
}

const NON_RETRYABLE_EXCEPTION_CLASSES: &[&str] = &["JobClassNotFound", "JobMethodNotFound"];

impl DefaultRetryFilter {
    pub fn new(clock: Arc<dyn Clock>, max_retries: u32) -> Self {
        Self { clock, jitter: Arc::new(RandomJitter), max_retries }
    }

    pub fn with_jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    fn backoff_delay(&self, attempt: u32) -> chrono::Duration {
        let base = 3f64.powi(attempt as i32);
        let jitter_fraction = self.jitter.sample().clamp(-1.0, 1.0) * 0.20;
        let seconds = (base * (1.0 + jitter_fraction)).max(0.0);
        chrono::Duration::milliseconds((seconds * 1000.0) as i64)
    }
}

impl JobFilter for DefaultRetryFilter {
    fn on_state_election(&self, job: &mut Job) {
        let JobState::Failed { exception_class, .. } = job.state() else { return };
        if NON_RETRYABLE_EXCEPTION_CLASSES.contains(&exception_class.as_str()) {
            return;
        }
        let attempt = job.failed_count() as u32;
        if attempt > self.max_retries {
            return;
        }
        let now = self.clock.now();
        let delay = self.backoff_delay(attempt);
        job.transition(JobState::Scheduled {
            scheduled_at: now + delay,
            reason: Some(format!("Retry attempt {attempt}")),
        });
    }
}

#[cfg(test)]
#[path = "job_filters_tests.rs"]
mod tests;
