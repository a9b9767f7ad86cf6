// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! `JobState` instants must be comparable across servers and stable across a
//! process restart, so the clock hands out wall-clock `DateTime<Utc>` rather
//! than a monotonic `std::time::Instant`. `FakeClock` is the seam every
//! timing-sensitive test (orphan detection, retention windows, backoff) uses
//! instead of sleeping on the wall clock.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    /// Start the fake clock at a fixed, deterministic instant (2026-01-01
    /// 00:00:00 UTC) rather than `Utc::now()` so tests are reproducible
    /// independent of wall-clock time.
    pub fn new() -> Self {
        let epoch = DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_else(Utc::now);
        Self { current: Arc::new(Mutex::new(epoch)) }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(instant)) }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
