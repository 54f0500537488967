// SPDX-License-Identifier: MIT

//! Process-wide shutdown flag: flipped once by the SIGTERM/SIGINT handler,
//! read by the poll loop and the health endpoint so both stop accepting new
//! work without threading a channel through every call site.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static SHUTDOWN: OnceLock<AtomicBool> = OnceLock::new();

fn flag() -> &'static AtomicBool {
    SHUTDOWN.get_or_init(|| AtomicBool::new(false))
}

/// Ensure the flag exists, cleared. Idempotent; safe to call from every
/// process entry point.
pub fn init() {
    flag();
}

/// Clear the flag. Test isolation only — production code never resets it
/// once a real shutdown signal has set it.
pub fn reset() {
    flag().store(false, Ordering::SeqCst);
}

/// Request shutdown. Called once from the signal handler.
pub fn request() {
    flag().store(true, Ordering::SeqCst);
}

/// Whether shutdown has been requested.
pub fn is_requested() -> bool {
    flag().load(Ordering::SeqCst)
}

#[cfg(test)]
#[path = "shutdown_flag_tests.rs"]
mod tests;
