// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiting for the job-stats change notification (§4.8).

use bgjob_core::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: chrono::DateTime<chrono::Utc>,
}

/// Classic token bucket: capacity refills continuously at `rate` tokens per
/// second, capped at `capacity`. `try_acquire` is the only operation a
/// protected caller needs — a burst of writes collapses to at most one
/// allowed notification per refill period (§4.8).
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// `rate` tokens per second, burst capacity equal to `rate` (at most one
    /// second's worth of notifications may queue up).
    pub fn new(rate_per_second: f64, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            bucket: Mutex::new(Bucket {
                tokens: rate_per_second,
                capacity: rate_per_second,
                refill_per_second: rate_per_second,
                last_refill: now,
            }),
        }
    }

    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut bucket = self.bucket.lock();
        let elapsed = (now - bucket.last_refill).num_milliseconds() as f64 / 1000.0;
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * bucket.refill_per_second).min(bucket.capacity);
            bucket.last_refill = now;
        }
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
