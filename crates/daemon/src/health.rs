// SPDX-License-Identifier: MIT

//! The health surface: a process-wide snapshot the poll loop
//! updates after every tick, and the Unix-socket endpoint that serves it as
//! JSON lines.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aof_core::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

/// A daemon is unhealthy once its last successful poll is older than this.
pub const STALE_POLL_THRESHOLD: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub scheduler: bool,
    pub store: bool,
    pub event_logger: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfig {
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: Status,
    pub uptime_secs: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub task_counts: HashMap<TaskStatus, usize>,
    pub components: ComponentHealth,
    pub config: HealthConfig,
}

/// Process-wide, updated by the poll loop after each tick and read by the
/// health endpoint. Timestamps are millis-since-epoch so they can live in
/// plain atomics rather than behind a mutex.
pub struct HealthState {
    started_at: DateTime<Utc>,
    last_poll_at_ms: AtomicI64,
    last_event_at_ms: AtomicI64,
    store_probe_ok: std::sync::atomic::AtomicBool,
    data_dir: PathBuf,
    poll_interval: Duration,
}

impl HealthState {
    pub fn new(started_at: DateTime<Utc>, data_dir: PathBuf, poll_interval: Duration) -> Self {
        Self {
            started_at,
            last_poll_at_ms: AtomicI64::new(0),
            last_event_at_ms: AtomicI64::new(0),
            store_probe_ok: std::sync::atomic::AtomicBool::new(true),
            data_dir,
            poll_interval,
        }
    }

    pub fn record_poll(&self, now: DateTime<Utc>, store_probe_ok: bool) {
        self.last_poll_at_ms.store(now.timestamp_millis(), Ordering::SeqCst);
        self.store_probe_ok.store(store_probe_ok, Ordering::SeqCst);
    }

    pub fn record_event(&self, now: DateTime<Utc>) {
        self.last_event_at_ms.store(now.timestamp_millis(), Ordering::SeqCst);
    }

    fn timestamp(raw: i64) -> Option<DateTime<Utc>> {
        if raw == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(raw)
    }

    pub fn report(&self, now: DateTime<Utc>, task_counts: HashMap<TaskStatus, usize>) -> HealthReport {
        let last_poll_at = Self::timestamp(self.last_poll_at_ms.load(Ordering::SeqCst));
        let store_ok = self.store_probe_ok.load(Ordering::SeqCst);
        let poll_is_fresh = last_poll_at
            .map(|t| (now - t).to_std().unwrap_or(Duration::MAX) <= STALE_POLL_THRESHOLD)
            .unwrap_or(false);
        let status = if poll_is_fresh && store_ok { Status::Healthy } else { Status::Unhealthy };

        HealthReport {
            status,
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            last_poll_at,
            last_event_at: Self::timestamp(self.last_event_at_ms.load(Ordering::SeqCst)),
            task_counts,
            components: ComponentHealth { scheduler: poll_is_fresh, store: store_ok, event_logger: store_ok },
            config: HealthConfig {
                data_dir: self.data_dir.clone(),
                poll_interval_ms: self.poll_interval.as_millis() as u64,
            },
        }
    }
}

/// Runs the health endpoint until the socket is closed by `shutdown`
/// removing the listener's backing file. One task per connection, each
/// handling a single JSON-lines request/response round trip.
pub async fn serve(listener: UnixListener, build_report: Arc<dyn Fn() -> HealthReport + Send + Sync>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "health endpoint accept error");
                continue;
            }
        };
        let build_report = build_report.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, build_report).await {
                tracing::debug!(%err, "health connection closed with error");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    build_report: Arc<dyn Fn() -> HealthReport + Send + Sync>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    if lines.next_line().await?.is_none() {
        return Ok(());
    }
    let report = build_report();
    let mut line = serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
