// SPDX-License-Identifier: MIT

//! A thin client for the daemon's health endpoint: connect over
//! the Unix socket, send one line, read one line back. The CLI does not
//! depend on `aof-daemon`, so the response shape is duplicated here as a
//! plain DTO rather than imported.

use std::collections::HashMap;
use std::path::PathBuf;

use aof_core::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (no response at {0})")]
    NotRunning(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response from daemon: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, Self::NotRunning(_))
            || matches!(
                self,
                Self::Io(e) if matches!(
                    e.kind(),
                    std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
                )
            )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub scheduler: bool,
    pub store: bool,
    pub event_logger: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfig {
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub uptime_secs: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub task_counts: HashMap<TaskStatus, usize>,
    pub components: ComponentHealth,
    pub config: HealthConfig,
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Probe for a listening socket. Does not hold a connection open —
    /// each query opens, round-trips, and closes, matching the health
    /// endpoint's one-request-per-connection protocol.
    pub fn connect(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::NotRunning(self.socket_path.clone()))?;
        stream.write_all(b"health\n").await?;
        let (reader, _writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| ClientError::NotRunning(self.socket_path.clone()))?;
        Ok(serde_json::from_str(&line)?)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
