// SPDX-License-Identifier: MIT

//! Lazily opens a [`Scheduler`]/[`ProjectHandle`] pair for every project the
//! registry discovers, and keeps them around for the life of the daemon.
//! One `aof-daemon` process serves every project under a data directory,
//! rather than one process per project.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use aof_adapters::ExecutorAdapter;
use aof_core::{Clock, ProjectId};
use aof_engine::{Scheduler, SchedulerConfig};
use aof_protocol::{ProjectHandle, ProjectResolver};
use aof_storage::{
    sync_delegation, EventLog, FilesystemTaskStore, Registry, RegistryError, StoreError, TaskStore,
};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectSetError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One project's share of the process: its store/event-log handle for the
/// protocol router, and the scheduler that polls it.
pub struct ProjectRuntime<C: Clock + 'static> {
    pub handle: ProjectHandle,
    pub scheduler: Scheduler<C>,
}

/// Discovers and caches per-project runtimes. `resolve` (used by
/// [`aof_protocol::Router`]) only ever returns already-opened projects —
/// `refresh` is what notices new ones, called once per poll tick.
pub struct ProjectSet<C: Clock + 'static> {
    registry: Registry,
    data_dir: PathBuf,
    clock: C,
    executor: Arc<dyn ExecutorAdapter>,
    scheduler_config: SchedulerConfig,
    runtimes: Mutex<HashMap<String, Arc<ProjectRuntime<C>>>>,
}

impl<C: Clock + 'static> ProjectSet<C> {
    pub fn open(
        data_dir: impl Into<PathBuf>,
        clock: C,
        executor: Arc<dyn ExecutorAdapter>,
        scheduler_config: SchedulerConfig,
    ) -> Result<Self, ProjectSetError> {
        let data_dir = data_dir.into();
        let registry = Registry::open(&data_dir)?;
        Ok(Self {
            registry,
            data_dir,
            clock,
            executor,
            scheduler_config,
            runtimes: Mutex::new(HashMap::new()),
        })
    }

    /// Discover any projects not yet opened and open them. Returns the
    /// number of newly-opened projects.
    pub fn refresh(&self) -> Result<usize, ProjectSetError> {
        let mut opened = 0;
        for record in self.registry.list(false)? {
            if self.runtimes.lock().contains_key(record.id.as_str()) {
                continue;
            }
            let runtime = self.open_project(&record.id)?;
            self.runtimes.lock().insert(record.id.as_str().to_string(), Arc::new(runtime));
            opened += 1;
        }
        Ok(opened)
    }

    fn open_project(&self, project_id: &ProjectId) -> Result<ProjectRuntime<C>, ProjectSetError> {
        let root = self.registry.project_dir(project_id);
        let event_log = Arc::new(EventLog::open(root.join("events"), &self.clock)?);
        let store: Arc<dyn TaskStore> = Arc::new(FilesystemTaskStore::open(
            &root,
            project_id.as_str(),
            self.clock.clone(),
            event_log.clone(),
        )?);
        let delegation_store = store.clone();
        store.register_transition_hook(Box::new(move |_task, _from, _to| {
            if let Err(err) = sync_delegation(delegation_store.as_ref()) {
                tracing::warn!(%err, "failed to refresh delegation pointers; continuing");
            }
        }));

        let scheduler = Scheduler::new(
            store.clone(),
            self.executor.clone(),
            event_log.clone(),
            self.clock.clone(),
            project_id.clone(),
            root.to_string_lossy().into_owned(),
            self.scheduler_config.clone(),
        );
        Ok(ProjectRuntime { handle: ProjectHandle { store, event_log }, scheduler })
    }

    /// Every currently-open project runtime, for the poll loop to drive.
    pub fn runtimes(&self) -> Vec<Arc<ProjectRuntime<C>>> {
        self.runtimes.lock().values().cloned().collect()
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }
}

impl<C: Clock + 'static> ProjectResolver for ProjectSet<C> {
    /// Only resolves project ids the registry actually knows about (or
    /// `_inbox`, always synthesized) — an unrecognized id must fail with
    /// `invalid_project_id` rather than silently provisioning a directory.
    fn resolve(&self, project_id: &ProjectId) -> Option<ProjectHandle> {
        if let Some(runtime) = self.runtimes.lock().get(project_id.as_str()) {
            return Some(runtime.handle.clone());
        }
        self.registry.get(project_id).ok().flatten()?;
        let runtime = self.open_project(project_id).ok()?;
        let handle = runtime.handle.clone();
        self.runtimes.lock().insert(project_id.as_str().to_string(), Arc::new(runtime));
        Some(handle)
    }
}

#[cfg(test)]
#[path = "project_set_tests.rs"]
mod tests;
