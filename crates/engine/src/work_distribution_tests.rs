// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn requests_free_capacity_at_default_multiplier() {
    let strategy = FixedWorkDistributionStrategy::default();
    let page = strategy.get_work_page_request(4, 1);
    assert_eq!(page.offset, 0);
    assert_eq!(page.limit, 3);
}

#[test]
fn multiplier_scales_the_request() {
    let strategy = FixedWorkDistributionStrategy::new(2);
    let page = strategy.get_work_page_request(4, 0);
    assert_eq!(page.limit, 8);
}

#[test]
fn saturated_pool_requests_nothing() {
    let strategy = FixedWorkDistributionStrategy::default();
    let page = strategy.get_work_page_request(4, 4);
    assert_eq!(page.limit, 0);
}

#[test]
fn currently_processing_never_exceeds_pool_size_without_panicking() {
    let strategy = FixedWorkDistributionStrategy::default();
    let page = strategy.get_work_page_request(4, 10);
    assert_eq!(page.limit, 0);
}
