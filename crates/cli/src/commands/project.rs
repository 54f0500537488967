// SPDX-License-Identifier: MIT

//! `aof project` — project discovery.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::output::{handle_list, OutputFormat};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// List discoverable projects (always includes `_inbox`)
    List {
        /// Include archived projects
        #[arg(long)]
        archived: bool,
    },
}

#[derive(serde::Serialize)]
struct ProjectRow {
    id: String,
    title: String,
    #[serde(rename = "type")]
    project_type: String,
    status: String,
}

pub fn run(args: ProjectArgs, data_dir: &std::path::Path, format: OutputFormat) -> Result<()> {
    match args.command {
        ProjectCommand::List { archived } => {
            let registry = crate::store::registry(data_dir)?;
            let rows: Vec<ProjectRow> = registry
                .list(archived)?
                .into_iter()
                .map(|record| match record.manifest {
                    Ok(manifest) => ProjectRow {
                        id: record.id.as_str().to_string(),
                        title: manifest.title,
                        project_type: manifest.project_type,
                        status: format!("{:?}", manifest.status).to_lowercase(),
                    },
                    Err(err) => ProjectRow {
                        id: record.id.as_str().to_string(),
                        title: String::new(),
                        project_type: String::new(),
                        status: format!("manifest error: {err}"),
                    },
                })
                .collect();

            handle_list(format, &rows, "No projects found", |rows| {
                for row in rows {
                    println!("{:<20}  {:<10}  {:<8}  {}", row.id, row.project_type, row.status, row.title);
                }
            })
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
