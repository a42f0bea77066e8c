// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Duration;

use super::{Clock, FakeClock, SystemClock};

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_advance_moves_time_forward() {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    let before = clock.now();
    clock.advance(Duration::minutes(31));
    let after = clock.now();
    assert_eq!(after - before, Duration::minutes(31));
}

#[test]
fn fake_clock_epoch_ms_tracks_advance() {
    let clock = FakeClock::at_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.epoch_ms(), 1_700_000_000_000);
    clock.advance(Duration::milliseconds(250));
    assert_eq!(clock.epoch_ms(), 1_700_000_000_250);
}
