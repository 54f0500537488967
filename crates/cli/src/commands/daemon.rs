// SPDX-License-Identifier: MIT

//! `aof daemon` — start/stop/health for the long-running process.

use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start {
        /// Run in the foreground instead (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon (SIGTERM, then SIGKILL after a grace period)
    Stop,
    /// Query the health endpoint
    Health,
}

pub async fn run(args: DaemonArgs, data_dir: &std::path::Path, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Health => health(data_dir, format).await,
    }
}

async fn start(foreground: bool) -> Result<()> {
    let binary = find_aofd_binary();
    if foreground {
        let status = Command::new(&binary).status()?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    Command::new(&binary)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("failed to start daemon ({}): {e}", binary.display()))?;
    println!("daemon starting");
    Ok(())
}

async fn stop() -> Result<()> {
    let lock_path = crate::env::lock_path()?;
    let Some(pid) = read_pid(&lock_path) else {
        println!("daemon not running");
        return Ok(());
    };

    kill_signal(pid, "-15");
    let timeout = Duration::from_secs(10);
    let start = Instant::now();
    while start.elapsed() < timeout && process_exists(pid) {
        std::thread::sleep(Duration::from_millis(50));
    }
    if process_exists(pid) {
        kill_signal(pid, "-9");
    }
    println!("daemon stopped");
    Ok(())
}

async fn health(data_dir: &std::path::Path, format: OutputFormat) -> Result<()> {
    let socket_path = data_dir.join("daemon.sock");
    let client = DaemonClient::connect(socket_path);
    match client.health().await {
        Ok(report) => format_or_json(format, &report, || {
            println!("status:     {:?}", report.status);
            println!("uptime:     {}s", report.uptime_secs);
            println!("data dir:   {}", report.config.data_dir.display());
            if let Some(last_poll) = report.last_poll_at {
                println!("last poll:  {last_poll}");
            }
            for (status, count) in &report.task_counts {
                println!("  {status:?}: {count}");
            }
        }),
        Err(err) if err.is_not_running() => {
            format_or_json(format, &serde_json::json!({ "status": "not_running" }), || {
                println!("daemon not running")
            })
        }
        Err(err) => Err(err.into()),
    }
}

fn find_aofd_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(PathBuf::from)) {
        let sibling = dir.join("aofd");
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from("aofd")
}

fn read_pid(lock_path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

fn kill_signal(pid: u32, signal: &str) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn process_exists(pid: u32) -> bool {
    kill_signal(pid, "-0")
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
