// SPDX-License-Identifier: MIT

//! Per-team dispatch throttle: one process-wide
//! map of the last time each team was dispatched to, so the scheduler can
//! postpone a team's next `assign` to the following poll instead of bursting
//! past `minDispatchIntervalMs`.

use std::collections::HashMap;
use std::sync::OnceLock;

use aof_core::TeamId;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

static THROTTLE: OnceLock<Mutex<HashMap<TeamId, DateTime<Utc>>>> = OnceLock::new();

fn state() -> &'static Mutex<HashMap<TeamId, DateTime<Utc>>> {
    THROTTLE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Ensure the global throttle map exists. Idempotent; safe to call from
/// every process entry point.
pub fn init() {
    state();
}

/// Clear all recorded dispatch times. Test isolation only — production
/// code never needs to reset this.
pub fn reset() {
    state().lock().clear();
}

/// Whether `team` may be dispatched to at `now`, given `min_interval`.
/// A team with no prior dispatch is always ready.
pub fn is_ready(team: &TeamId, now: DateTime<Utc>, min_interval: ChronoDuration) -> bool {
    match state().lock().get(team) {
        Some(last) => now - *last >= min_interval,
        None => true,
    }
}

/// Record that `team` was just dispatched to at `now`.
pub fn record(team: &TeamId, now: DateTime<Utc>) {
    state().lock().insert(team.clone(), now);
}

#[cfg(test)]
#[path = "throttle_tests.rs"]
mod tests;
