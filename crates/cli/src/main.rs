// SPDX-License-Identifier: MIT

//! `aof` — operator CLI entry point.

use anyhow::Result;
use aof::commands::{daemon, project, task};
use aof::output::OutputFormat;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aof", version, about = "Filesystem-native multi-agent task orchestrator")]
struct Cli {
    #[arg(long, value_enum, global = true, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Task CRUD against the store
    Task(task::TaskArgs),
    /// Project discovery
    Project(project::ProjectArgs),
    /// Daemon lifecycle and health
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = aof::store::default_data_dir()?;

    match cli.command {
        Command::Task(args) => task::run(args, &data_dir, cli.output),
        Command::Project(args) => project::run(args, &data_dir, cli.output),
        Command::Daemon(args) => daemon::run(args, &data_dir, cli.output).await,
    }
}
