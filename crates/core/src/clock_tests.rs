// SPDX-License-Identifier: MIT

use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_by_duration() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.now(), start + chrono::Duration::seconds(60));
}

#[test]
fn fake_clock_can_be_set_directly() {
    let clock = FakeClock::new();
    let target = DateTime::UNIX_EPOCH + chrono::Duration::days(1);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    std::thread::sleep(Duration::from_millis(5));
    let b = clock.now();
    assert!(b >= a);
}
