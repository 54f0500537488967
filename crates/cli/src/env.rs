// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Resolve the data directory: `AOF_DATA_DIR` > platform state dir (e.g.
/// `$XDG_STATE_HOME`) > `~/.local/state` > error. Mirrors `aof-daemon`'s own
/// resolution so the CLI and the daemon it talks to always agree on where
/// tasks live, without the CLI depending on the daemon crate.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("AOF_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .map(|dir| dir.join("aof"))
        .ok_or_else(|| anyhow!("could not determine a data directory: set AOF_DATA_DIR or HOME"))
}

pub fn socket_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("daemon.sock"))
}

pub fn lock_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("daemon.pid"))
}

pub fn daemon_binary() -> Option<String> {
    std::env::var("AOF_DAEMON_BINARY").ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
