// SPDX-License-Identifier: MIT

//! Opens a project's task store directly off disk, the way every `aof
//! task` subcommand operates — no daemon round trip required. The CLI is
//! an external collaborator of the core, not a client of the daemon, for
//! task CRUD.

use std::path::PathBuf;
use std::sync::Arc;

use aof_core::{ProjectId, SystemClock};
use aof_storage::{EventLog, FilesystemTaskStore, Registry};
use anyhow::{Context, Result};

pub fn open_store(
    data_dir: &std::path::Path,
    project: &str,
) -> Result<FilesystemTaskStore<SystemClock>> {
    let registry = Registry::open(data_dir).context("opening project registry")?;
    let project_id = ProjectId::new(project).map_err(anyhow::Error::msg)?;
    let root = registry.project_dir(&project_id);
    let event_log = Arc::new(
        EventLog::open(root.join("events"), &SystemClock)
            .with_context(|| format!("opening event log for project {project}"))?,
    );
    FilesystemTaskStore::open(root, project_id.as_str(), SystemClock, event_log)
        .with_context(|| format!("opening task store for project {project}"))
}

pub fn registry(data_dir: &std::path::Path) -> Result<Registry> {
    Registry::open(data_dir).context("opening project registry")
}

pub fn default_data_dir() -> Result<PathBuf> {
    crate::env::data_dir()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
