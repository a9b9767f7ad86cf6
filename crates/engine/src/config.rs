// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BackgroundJobServerConfiguration` (§6 "Configuration (recognized
//! options)"): a plain struct with a builder, never global/static state.

use std::time::Duration;

/// Recognized configuration options for a `BackgroundJobServer` (§6).
#[derive(Debug, Clone)]
pub struct BackgroundJobServerConfiguration {
    pub poll_interval: Duration,
    pub worker_pool_size: usize,
    pub delete_succeeded_jobs_after: Duration,
    pub permanently_delete_deleted_jobs_after: Duration,
    pub max_retries: u32,
    pub change_notification_rate_limit: f64,
    /// JobRunr-style "look ahead" knob (§4.4.1): how many multiples of free
    /// worker capacity to request per enqueued-work pull.
    pub work_distribution_multiplier: usize,
}

impl Default for BackgroundJobServerConfiguration {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            worker_pool_size: 4,
            delete_succeeded_jobs_after: Duration::from_secs(36 * 3600),
            permanently_delete_deleted_jobs_after: Duration::from_secs(72 * 3600),
            max_retries: 10,
            change_notification_rate_limit: 5.0,
            work_distribution_multiplier: 1,
        }
    }
}

impl BackgroundJobServerConfiguration {
    pub fn builder() -> BackgroundJobServerConfigurationBuilder {
        BackgroundJobServerConfigurationBuilder::default()
    }

    /// Minimum allowed poll interval (§5 "Timeouts").
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// The orphan-detection staleness threshold: `4 × pollInterval` (§4.3 step 3).
    pub fn orphan_staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.poll_interval * 4)
            .unwrap_or_else(|_| chrono::Duration::seconds(60))
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJobServerConfigurationBuilder {
    config: BackgroundJobServerConfiguration,
}

impl Default for BackgroundJobServerConfigurationBuilder {
    fn default() -> Self {
        Self { config: BackgroundJobServerConfiguration::default() }
    }
}

impl BackgroundJobServerConfigurationBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(BackgroundJobServerConfiguration::MIN_POLL_INTERVAL);
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.config.worker_pool_size = size;
        self
    }

    pub fn delete_succeeded_jobs_after(mut self, after: Duration) -> Self {
        self.config.delete_succeeded_jobs_after = after;
        self
    }

    pub fn permanently_delete_deleted_jobs_after(mut self, after: Duration) -> Self {
        self.config.permanently_delete_deleted_jobs_after = after;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn change_notification_rate_limit(mut self, rate: f64) -> Self {
        self.config.change_notification_rate_limit = rate;
        self
    }

    pub fn work_distribution_multiplier(mut self, multiplier: usize) -> Self {
        self.config.work_distribution_multiplier = multiplier;
        self
    }

    pub fn build(self) -> BackgroundJobServerConfiguration {
        self.config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
