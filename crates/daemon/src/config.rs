// SPDX-License-Identifier: MIT

//! Daemon configuration: where state lives and how the poll loop is
//! tuned. Resolution order: an explicit env var wins, then `config`-crate
//! file layering, then a hardcoded default.

use std::path::PathBuf;
use std::time::Duration;

use aof_engine::SchedulerConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a data directory: set AOF_DATA_DIR or HOME")]
    NoDataDir,
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// `config`-crate deserialization target; [`Config`] fills in path fields
/// that depend on `data_dir` after this loads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    data_dir: Option<String>,
    poll_interval_ms: u64,
    cascade_blocks: bool,
    max_concurrent_dispatches: u32,
    max_dispatches_per_poll: u32,
    min_dispatch_interval_ms: i64,
    default_lease_ttl_secs: u64,
    heartbeat_ttl_secs: u64,
    spawn_timeout_secs: u64,
    max_retries: u32,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            poll_interval_ms: 2_000,
            cascade_blocks: false,
            max_concurrent_dispatches: 4,
            max_dispatches_per_poll: 4,
            min_dispatch_interval_ms: 5_000,
            default_lease_ttl_secs: 15 * 60,
            heartbeat_ttl_secs: 60,
            spawn_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub poll_interval: Duration,
    pub cascade_blocks: bool,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration: `AOF_` environment overrides layered on top of
    /// `aof.toml` in the current directory (both optional), then defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = RawConfig::default();
        let builder = config::Config::builder()
            .set_default("pollIntervalMs", defaults.poll_interval_ms)?
            .set_default("cascadeBlocks", defaults.cascade_blocks)?
            .set_default("maxConcurrentDispatches", defaults.max_concurrent_dispatches)?
            .set_default("maxDispatchesPerPoll", defaults.max_dispatches_per_poll)?
            .set_default("minDispatchIntervalMs", defaults.min_dispatch_interval_ms)?
            .set_default("defaultLeaseTtlSecs", defaults.default_lease_ttl_secs)?
            .set_default("heartbeatTtlSecs", defaults.heartbeat_ttl_secs)?
            .set_default("spawnTimeoutSecs", defaults.spawn_timeout_secs)?
            .set_default("maxRetries", defaults.max_retries)?
            .add_source(config::File::with_name("aof").required(false))
            .add_source(config::Environment::with_prefix("AOF").separator("_"));
        let raw: RawConfig = builder.build()?.try_deserialize()?;

        let data_dir = match raw.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            lock_path: data_dir.join("daemon.pid"),
            cascade_blocks: raw.cascade_blocks,
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            scheduler: SchedulerConfig {
                max_concurrent_dispatches: raw.max_concurrent_dispatches,
                min_dispatch_interval: chrono::Duration::milliseconds(raw.min_dispatch_interval_ms),
                max_dispatches_per_poll: raw.max_dispatches_per_poll,
                default_lease_ttl: Duration::from_secs(raw.default_lease_ttl_secs),
                heartbeat_ttl: Duration::from_secs(raw.heartbeat_ttl_secs),
                spawn_timeout: Duration::from_secs(raw.spawn_timeout_secs),
                max_retries: raw.max_retries,
            },
            data_dir,
        })
    }
}

/// `AOF_DATA_DIR` wins outright; otherwise the platform state directory
/// (`$XDG_STATE_HOME` or `~/.local/state` on Linux) plus `/aof`.
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("AOF_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .map(|dir| dir.join("aof"))
        .ok_or(ConfigError::NoDataDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
