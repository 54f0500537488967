// SPDX-License-Identifier: MIT

//! Daemon startup, poll loop, and shutdown.
//!
//! Order matters and is deliberately different from a naive "lock first"
//! daemon: resolve the data dir, open the store and event log (these must
//! succeed), start the health endpoint, self-check it, and only then write
//! the PID file and start polling. A PID file already present and unlocked
//! at that point is a crash, not a conflict — it's replaced and logged as
//! `system.crash_recovery` rather than treated as a startup failure.

use std::io::Write as _;
use std::sync::Arc;

use aof_adapters::NoopExecutorAdapter;
use aof_core::{event_type, Event, SystemClock};
use aof_protocol::{ProjectResolver, Router, RouterConfig};
use fs2::FileExt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::config::Config;
use crate::health::{HealthReport, HealthState};
use crate::project_set::{ProjectSet, ProjectSetError};
use crate::shutdown_flag;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a data directory")]
    NoDataDir,
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("failed to bind health socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),
    #[error("self-check against the health endpoint failed: {0}")]
    SelfCheckFailed(std::io::Error),
    #[error(transparent)]
    ProjectSet(#[from] ProjectSetError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running daemon: the poll loop and the health endpoint, both driven
/// from [`run`] until `shutdown_flag` is set.
pub struct Daemon {
    config: Config,
    projects: Arc<ProjectSet<SystemClock>>,
    router: Router<SystemClock>,
    health: Arc<HealthState>,
    lock_file: std::fs::File,
}

impl Daemon {
    /// Run the full startup sequence and return a ready-to-poll daemon.
    pub async fn start(config: Config) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&config.data_dir)?;

        let clock = SystemClock;
        let started_at = chrono::Utc::now();

        let projects = Arc::new(ProjectSet::open(
            &config.data_dir,
            clock.clone(),
            Arc::new(NoopExecutorAdapter),
            config.scheduler.clone(),
        )?);
        projects.refresh()?;

        let router = Router::new(
            projects.clone(),
            clock,
            RouterConfig { cascade_blocks: config.cascade_blocks },
        );

        let health = Arc::new(HealthState::new(started_at, config.data_dir.clone(), config.poll_interval));

        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }
        let listener = UnixListener::bind(&config.socket_path)
            .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

        let report_health = health.clone();
        let report_projects = projects.clone();
        let build_report: Arc<dyn Fn() -> HealthReport + Send + Sync> = Arc::new(move || {
            let counts = merged_task_counts(&report_projects);
            report_health.report(chrono::Utc::now(), counts)
        });
        tokio::spawn(crate::health::serve(listener, build_report));

        self_check(&config.socket_path).await.map_err(LifecycleError::SelfCheckFailed)?;

        let lock_file = acquire_pid_lock(&config, &projects)?;

        info!(data_dir = %config.data_dir.display(), "daemon started");
        Ok(Self { config, projects, router, health, lock_file })
    }

    /// Run the poll loop until shutdown is requested, then drain.
    pub async fn run(self) -> Result<(), LifecycleError> {
        let poll_interval = self.config.poll_interval;
        while !shutdown_flag::is_requested() {
            self.tick().await;
            tokio::time::sleep(poll_interval).await;
        }
        self.shutdown()
    }

    async fn tick(&self) {
        if let Err(err) = self.projects.refresh() {
            warn!(%err, "failed to refresh project set");
        }

        let mut store_probe_ok = true;
        for runtime in self.projects.runtimes() {
            match runtime.scheduler.poll().await {
                Ok(_) => {}
                Err(err) => {
                    store_probe_ok = false;
                    warn!(%err, "poll failed for a project");
                }
            }
        }
        self.health.record_poll(chrono::Utc::now(), store_probe_ok);

        let last_event = self
            .projects
            .runtimes()
            .iter()
            .filter_map(|r| r.handle.event_log.last_event_at().ok().flatten())
            .max();
        if let Some(last_event) = last_event {
            self.health.record_event(last_event);
        }
    }

    /// Handle one protocol envelope. Exposed for the IPC layer once agents
    /// have a transport to deliver envelopes through.
    pub fn route(&self, envelope: aof_protocol::Envelope) -> Result<(), aof_protocol::ProtocolError> {
        self.router.handle(envelope)
    }

    fn shutdown(self) -> Result<(), LifecycleError> {
        info!("daemon shutting down");
        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        if self.config.lock_path.exists() {
            let _ = std::fs::remove_file(&self.config.lock_path);
        }
        drop(self.lock_file);
        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Connect to the just-bound socket and confirm it answers before the
/// daemon declares itself ready.
async fn self_check(socket_path: &std::path::Path) -> std::io::Result<()> {
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(b"self-check\n").await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    lines.next_line().await?;
    Ok(())
}

/// Acquire the exclusive PID lock. A lock file that already has contents
/// at this point belonged to a daemon that crashed without cleaning up
/// (the OS released its advisory lock when that process died); log
/// `system.crash_recovery` against the inbox project before overwriting it.
fn acquire_pid_lock(
    config: &Config,
    projects: &ProjectSet<SystemClock>,
) -> Result<std::fs::File, LifecycleError> {
    let lock_file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let stale = std::fs::metadata(&config.lock_path).map(|m| m.len() > 0).unwrap_or(false);
    if stale {
        if let Some(handle) = projects.resolve(&aof_core::ProjectId::inbox()) {
            let event = Event::new(event_type::SYSTEM_CRASH_RECOVERY, "daemon", chrono::Utc::now());
            let _ = handle.event_log.append(event, &SystemClock);
            warn!("recovered from a stale PID file; previous daemon likely crashed");
        }
    }

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    std::io::Seek::seek(&mut lock_file, std::io::SeekFrom::Start(0))?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

fn merged_task_counts(
    projects: &ProjectSet<SystemClock>,
) -> std::collections::HashMap<aof_core::TaskStatus, usize> {
    let mut out = std::collections::HashMap::new();
    for runtime in projects.runtimes() {
        let Ok(counts) = runtime.handle.store.count_by_status() else { continue };
        for (status, count) in counts {
            *out.entry(status).or_insert(0) += count;
        }
    }
    out
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
