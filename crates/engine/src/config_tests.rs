// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn defaults_match_documented_values() {
    let config = BackgroundJobServerConfiguration::default();
    assert_eq!(config.poll_interval, Duration::from_secs(15));
    assert_eq!(config.max_retries, 10);
    assert_eq!(config.work_distribution_multiplier, 1);
}

#[test]
fn poll_interval_is_clamped_to_the_minimum() {
    let config = BackgroundJobServerConfiguration::builder()
        .poll_interval(Duration::from_secs(1))
        .build();
    assert_eq!(config.poll_interval, BackgroundJobServerConfiguration::MIN_POLL_INTERVAL);
}

#[test]
fn orphan_staleness_threshold_is_four_times_poll_interval() {
    let config = BackgroundJobServerConfiguration::builder()
        .poll_interval(Duration::from_secs(10))
        .build();
    assert_eq!(config.orphan_staleness_threshold(), chrono::Duration::seconds(40));
}
