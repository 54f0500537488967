// SPDX-License-Identifier: MIT

//! AOF Daemon (aofd) — resolves the data directory, opens every project's
//! store and event log, serves the health endpoint, and runs the poll loop
//! until SIGTERM/SIGINT.

use aof_daemon::{Config, Daemon};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("aofd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("aofd {}", env!("CARGO_PKG_VERSION"));
                println!("Agent orchestration daemon; polls task stores and serves a health endpoint.");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let _log_guard = setup_logging(&config)?;
    aof_daemon::shutdown_flag::init();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, draining"),
            _ = sigint.recv() => info!("received SIGINT, draining"),
        }
        aof_daemon::shutdown_flag::request();
    });

    let daemon = match Daemon::start(config).await {
        Ok(daemon) => daemon,
        Err(err) => {
            error!(%err, "failed to start daemon");
            return Err(err.into());
        }
    };

    println!("READY");
    daemon.run().await?;
    Ok(())
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.data_dir.join("daemon.log");
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = log_path.file_name().expect("daemon.log has a file name");
    let file_appender = tracing_appender::rolling::never(log_path.parent().expect("has parent"), file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
