// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_monotonically() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::seconds(15));
    let t1 = clock.now();
    assert_eq!(t1 - t0, Duration::seconds(15));
}

#[test]
fn fake_clock_set_overrides_current_instant() {
    let clock = FakeClock::new();
    let target = DateTime::parse_from_rfc3339("2030-06-15T12:00:00Z").unwrap().with_timezone(&Utc);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn system_clock_reports_time_close_to_now() {
    let clock = SystemClock;
    let delta = Utc::now() - clock.now();
    assert!(delta.num_seconds().abs() < 5);
}
