// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.epoch_ms();
    clock2.advance(Duration::from_secs(30));
    assert_eq!(clock1.epoch_ms(), t1 + 30_000);
}

#[test]
fn fake_clock_starts_on_a_minute_boundary() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms() % 60_000, 0);
}

#[yare::parameterized(
    same_minute_start = { 120_000, 120_000, true },
    same_minute_end   = { 120_000, 179_999, true },
    next_minute       = { 120_000, 180_000, false },
    previous_minute   = { 120_000, 119_999, false },
)]
fn minute_window(a: u64, b: u64, same: bool) {
    assert_eq!(minute_of(a) == minute_of(b), same);
}

#[test]
fn minute_tracks_advance() {
    let clock = FakeClock::at(60_000 * 10 + 59_000);
    assert_eq!(minute_of(clock.epoch_ms()), 10);
    clock.advance(Duration::from_secs(1));
    assert_eq!(minute_of(clock.epoch_ms()), 11);
}
