// SPDX-License-Identifier: MIT

//! The filesystem-native task store: ground truth for tasks,
//! one Markdown card per task under a directory-per-status layout, every
//! mutation written atomically and logged.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use aof_core::{
    AgentId, Clock, Event, Priority, Routing, RunInfo, RunStatus, Task, TaskId, TaskStatus, event_type,
};
use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;

use crate::event_log::EventLog;
use crate::task_file;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),
    #[error("illegal transition: {0} -> {1}")]
    IllegalTransition(TaskStatus, TaskStatus),
    #[error("task {0} is terminal")]
    Terminal(TaskId),
    #[error("dependency cycle: {0} already depends (transitively) on {1}")]
    DependencyCycle(TaskId, TaskId),
    #[error("missing dependency target: {0}")]
    MissingDependency(TaskId),
    #[error("corrupted store state: {0}")]
    Corruption(String),
}

/// The event-logging side of a mutation never blocks the caller — but a
/// failure is too important to discard silently, so the store reports it
/// here instead of propagating it as a hard error.
impl From<crate::event_log::EventLogError> for StoreError {
    fn from(err: crate::event_log::EventLogError) -> Self {
        match err {
            crate::event_log::EventLogError::Io(e) => Self::Io(e),
            crate::event_log::EventLogError::Json(e) => {
                Self::Corruption(format!("event serialization failed: {e}"))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub title: String,
    pub body: Option<String>,
    pub priority: Option<Priority>,
    pub routing: Option<Routing>,
    pub parent_id: Option<TaskId>,
    pub depends_on: Vec<TaskId>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub routing: Option<Routing>,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<TaskStatus>,
    pub agent: Option<AgentId>,
}

/// A post-transition hook. Invoked after a transition has been committed
/// (header written, event logged) with the task's new state and the
/// (from, to) status edge. The delegation synchronizer registers here.
pub type TransitionHook = Box<dyn Fn(&Task, TaskStatus, TaskStatus) + Send + Sync>;

/// Per-task in-process mutual exclusion. Every store operation on a given
/// task id is serialized through this, independent of the protocol
/// router's own per-task lock.
#[derive(Default)]
pub struct TaskLocks {
    locks: Mutex<HashMap<TaskId, Arc<Mutex<()>>>>,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: TaskId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub fn with_lock<T>(&self, id: TaskId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(id);
        let _guard = lock.lock();
        f()
    }
}

/// Ground truth for tasks. Dyn-safe so callers can hold `Arc<dyn TaskStore>`
/// without committing to a concrete clock type.
pub trait TaskStore: Send + Sync {
    fn create(&self, input: CreateTaskInput) -> Result<Task, StoreError>;
    fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;
    fn get_by_prefix(&self, prefix: &str) -> Result<Option<Task>, StoreError>;
    fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, StoreError>;
    fn transition(
        &self,
        id: &TaskId,
        to: TaskStatus,
        reason: Option<&str>,
        agent: Option<&AgentId>,
    ) -> Result<Task, StoreError>;
    fn cancel(&self, id: &TaskId, reason: Option<&str>) -> Result<Task, StoreError>;
    fn block(&self, id: &TaskId, reason: &str) -> Result<Task, StoreError>;
    fn unblock(&self, id: &TaskId) -> Result<Task, StoreError>;
    fn update(&self, id: &TaskId, patch: UpdateTaskPatch) -> Result<Task, StoreError>;
    fn update_body(&self, id: &TaskId, body: String) -> Result<Task, StoreError>;
    fn add_dep(&self, id: &TaskId, blocker: &TaskId) -> Result<Task, StoreError>;
    fn remove_dep(&self, id: &TaskId, blocker: &TaskId) -> Result<Task, StoreError>;
    fn write_task_output(&self, id: &TaskId, filename: &str, contents: &[u8]) -> Result<(), StoreError>;
    fn count_by_status(&self) -> Result<HashMap<TaskStatus, usize>, StoreError>;
    fn delete(&self, id: &TaskId) -> Result<bool, StoreError>;
    fn task_dir(&self, id: &TaskId, status: TaskStatus) -> PathBuf;
    fn register_transition_hook(&self, hook: TransitionHook);

    /// Acquire an exclusive lease for `agent` and transition `ready -> in-progress`
    /// in one atomic step.
    fn acquire_lease(
        &self,
        id: &TaskId,
        agent: &AgentId,
        ttl: std::time::Duration,
    ) -> Result<Task, StoreError>;
    /// Extend an active lease's `expiresAt` by `ttl` and bump `renewCount`.
    fn renew_lease(&self, id: &TaskId, ttl: std::time::Duration) -> Result<Task, StoreError>;
    /// Clear a task's lease without changing its status.
    fn release_lease(&self, id: &TaskId) -> Result<Task, StoreError>;
    /// All `in-progress` tasks whose lease has expired as of `now`.
    fn expired_leases(&self, now: chrono::DateTime<Utc>) -> Result<Vec<Task>, StoreError>;

    /// Merge `updates` into a task's metadata map and persist, without
    /// touching status or emitting a `task.updated` event (dispatch uses
    /// this to stamp `correlationId`, `sessionId`, `retryCount`, etc.
    /// alongside a status change it emits its own event for).
    fn merge_metadata(
        &self,
        id: &TaskId,
        updates: HashMap<String, serde_json::Value>,
    ) -> Result<Task, StoreError>;
}

/// The on-disk, per-project task store.
pub struct FilesystemTaskStore<C: Clock> {
    root: PathBuf,
    project_id: String,
    clock: C,
    locks: TaskLocks,
    event_log: Arc<EventLog>,
    hooks: Mutex<Vec<TransitionHook>>,
}

impl<C: Clock> FilesystemTaskStore<C> {
    /// Open (creating directories as needed) the store for one project
    /// root, e.g. `projects/<id>`.
    pub fn open(
        root: impl Into<PathBuf>,
        project_id: impl Into<String>,
        clock: C,
        event_log: Arc<EventLog>,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        for status in TaskStatus::all() {
            fs::create_dir_all(root.join("tasks").join(status.dir_name()))?;
        }
        Ok(Self {
            root,
            project_id: project_id.into(),
            clock,
            locks: TaskLocks::new(),
            event_log,
            hooks: Mutex::new(Vec::new()),
        })
    }

    fn status_dir(&self, status: TaskStatus) -> PathBuf {
        self.root.join("tasks").join(status.dir_name())
    }

    fn card_path(&self, status: TaskStatus, id: &TaskId) -> PathBuf {
        self.status_dir(status).join(format!("{id}.md"))
    }

    fn working_dir(&self, status: TaskStatus, id: &TaskId) -> PathBuf {
        self.status_dir(status).join(id.as_str())
    }

    fn find_card(&self, id: &TaskId) -> Result<Option<(TaskStatus, PathBuf, Task)>, StoreError> {
        for status in TaskStatus::all() {
            let path = self.card_path(status, id);
            if path.exists() {
                let raw = fs::read_to_string(&path)?;
                let task = task_file::decode(&raw)?;
                if task.status != status {
                    return Err(StoreError::Corruption(format!(
                        "task {id} lives in {} but header says {}",
                        status, task.status
                    )));
                }
                return Ok(Some((status, path, task)));
            }
        }
        Ok(None)
    }

    fn require_card(&self, id: &TaskId) -> Result<(TaskStatus, PathBuf, Task), StoreError> {
        self.find_card(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn emit(&self, event_type: &str, task: &Task, payload: serde_json::Value) {
        let event = Event::new(event_type, task.metadata_str("lastActor").unwrap_or("system"), self.clock.now())
            .with_task(task.id)
            .with_project(self.project_id.clone())
            .with_payload(payload);
        if let Err(err) = self.event_log.append(event, &self.clock) {
            tracing::warn!(task = %task.id, %err, "failed to append event; continuing");
        }
    }

    fn persist(&self, status: TaskStatus, task: &Task) -> Result<(), StoreError> {
        let raw = task_file::encode(task)?;
        task_file::write_atomic(&self.card_path(status, &task.id), &raw)
    }

    /// Move a task's card (and working directory, if present) from one
    /// status directory to another.
    fn relocate(&self, id: &TaskId, from: TaskStatus, to: TaskStatus, task: &Task) -> Result<(), StoreError> {
        self.persist(to, task)?;
        let old_card = self.card_path(from, id);
        if old_card.exists() {
            fs::remove_file(&old_card)?;
        }
        let old_dir = self.working_dir(from, id);
        if old_dir.exists() {
            let new_dir = self.working_dir(to, id);
            fs::rename(&old_dir, &new_dir)?;
        }
        Ok(())
    }

    /// Write (or rewrite) `run.json` in a task's working directory.
    fn write_run_info(&self, status: TaskStatus, info: &RunInfo) -> Result<(), StoreError> {
        let dir = self.working_dir(status, &info.task_id);
        fs::create_dir_all(&dir)?;
        let contents = serde_json::to_string_pretty(info)?;
        task_file::write_atomic(&dir.join("run.json"), &contents)
    }

    /// Update an existing `run.json`'s status in place, best-effort. A task
    /// that never acquired a lease (e.g. cancelled straight out of backlog)
    /// has no `run.json` to update, which is not an error.
    fn sync_run_status(&self, status: TaskStatus, id: &TaskId, run_status: RunStatus) {
        let path = self.working_dir(status, id).join("run.json");
        let Ok(raw) = fs::read_to_string(&path) else { return };
        let Ok(mut info) = serde_json::from_str::<RunInfo>(&raw) else { return };
        info.status = run_status;
        if let Err(err) = self.write_run_info(status, &info) {
            tracing::warn!(task = %id, %err, "failed to update run.json status; continuing");
        }
    }

    fn run_hooks(&self, task: &Task, from: TaskStatus, to: TaskStatus) {
        for hook in self.hooks.lock().iter() {
            hook(task, from, to);
        }
    }

    fn would_create_cycle(&self, id: &TaskId, new_blocker: &TaskId) -> Result<bool, StoreError> {
        if id == new_blocker {
            return Ok(true);
        }
        let mut queue = VecDeque::from([*new_blocker]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if current == *id {
                return Ok(true);
            }
            if let Some((_, _, task)) = self.find_card(&current)? {
                for dep in task.depends_on {
                    queue.push_back(dep);
                }
            }
        }
        Ok(false)
    }
}

impl<C: Clock> TaskStore for FilesystemTaskStore<C> {
    fn create(&self, input: CreateTaskInput) -> Result<Task, StoreError> {
        for dep in &input.depends_on {
            if self.find_card(dep)?.is_none() {
                return Err(StoreError::MissingDependency(*dep));
            }
        }
        let id = TaskId::generate(&self.clock);
        let now = self.clock.now();
        let task = Task {
            id,
            project: self.project_id.clone(),
            title: input.title,
            status: TaskStatus::Backlog,
            priority: input.priority.unwrap_or_default(),
            routing: input.routing.unwrap_or_default(),
            lease: None,
            depends_on: input.depends_on,
            parent_id: input.parent_id,
            created_at: now,
            updated_at: now,
            last_transition_at: now,
            created_by: input.created_by,
            metadata: input.metadata,
            gate: None,
            required_runbook: None,
            instructions_ref: None,
            guidance_ref: None,
            sla: None,
            content_hash: content_hash(input.body.as_deref().unwrap_or("")),
            extra: serde_json::Map::new(),
            body: input.body.unwrap_or_default(),
        };
        self.locks.with_lock(task.id, || -> Result<(), StoreError> {
            if self.find_card(&task.id)?.is_some() {
                return Err(StoreError::AlreadyExists(task.id));
            }
            self.persist(TaskStatus::Backlog, &task)
        })?;
        self.emit(event_type::TASK_CREATED, &task, serde_json::json!({"title": task.title}));
        Ok(task)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.find_card(id)?.map(|(_, _, task)| task))
    }

    fn get_by_prefix(&self, prefix: &str) -> Result<Option<Task>, StoreError> {
        let mut found = None;
        for status in TaskStatus::all() {
            let dir = self.status_dir(status);
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if stem.starts_with(prefix) {
                    let raw = fs::read_to_string(&path)?;
                    let task = task_file::decode(&raw)?;
                    if found.is_some() {
                        return Err(StoreError::Corruption(format!(
                            "prefix {prefix} matches more than one task"
                        )));
                    }
                    found = Some(task);
                }
            }
        }
        Ok(found)
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, StoreError> {
        let statuses: Vec<TaskStatus> = match filter.status {
            Some(s) => vec![s],
            None => TaskStatus::all().to_vec(),
        };
        let mut out = Vec::new();
        for status in statuses {
            let dir = self.status_dir(status);
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let raw = fs::read_to_string(&path)?;
                let task = task_file::decode(&raw)?;
                if let Some(agent) = &filter.agent {
                    if task.routing.agent.as_ref() != Some(agent) {
                        continue;
                    }
                }
                out.push(task);
            }
        }
        Ok(out)
    }

    fn transition(
        &self,
        id: &TaskId,
        to: TaskStatus,
        reason: Option<&str>,
        agent: Option<&AgentId>,
    ) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (from, _path, mut task) = self.require_card(id)?;
            if !TaskStatus::can_transition(from, to) {
                return Err(if from.is_terminal() {
                    StoreError::Terminal(*id)
                } else {
                    StoreError::IllegalTransition(from, to)
                });
            }
            let now = self.clock.now();
            task.status = to;
            task.updated_at = now;
            task.last_transition_at = now;
            if to != TaskStatus::InProgress {
                task.lease = None;
            }
            if let Some(reason) = reason {
                task.set_metadata("lastTransitionReason", reason.to_string());
            }
            if let Some(agent) = agent {
                task.set_metadata("lastActor", agent.to_string());
            }
            self.relocate(id, from, to, &task)?;
            if from == TaskStatus::InProgress {
                let run_status = match to {
                    TaskStatus::Done => Some(RunStatus::Completed),
                    TaskStatus::Cancelled => Some(RunStatus::Abandoned),
                    TaskStatus::Deadletter => Some(RunStatus::Failed),
                    _ => None,
                };
                if let Some(run_status) = run_status {
                    self.sync_run_status(to, id, run_status);
                }
            }
            let event_name = match to {
                TaskStatus::Cancelled => event_type::TASK_CANCELLED,
                TaskStatus::Blocked => event_type::TASK_BLOCKED,
                TaskStatus::Done => event_type::TASK_COMPLETED,
                _ => event_type::TASK_TRANSITIONED,
            };
            self.emit(
                event_name,
                &task,
                serde_json::json!({"from": from.to_string(), "to": to.to_string(), "reason": reason}),
            );
            self.run_hooks(&task, from, to);
            Ok(task)
        })
    }

    fn cancel(&self, id: &TaskId, reason: Option<&str>) -> Result<Task, StoreError> {
        self.transition(id, TaskStatus::Cancelled, reason, None)
    }

    fn block(&self, id: &TaskId, reason: &str) -> Result<Task, StoreError> {
        self.transition(id, TaskStatus::Blocked, Some(reason), None)
    }

    fn unblock(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.transition(id, TaskStatus::Ready, None, None)
    }

    fn update(&self, id: &TaskId, patch: UpdateTaskPatch) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            if task.is_terminal() {
                return Err(StoreError::Terminal(*id));
            }
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(routing) = patch.routing {
                task.routing = routing;
            }
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            self.emit(event_type::TASK_UPDATED, &task, serde_json::json!({}));
            Ok(task)
        })
    }

    fn update_body(&self, id: &TaskId, body: String) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            if task.is_terminal() {
                return Err(StoreError::Terminal(*id));
            }
            task.content_hash = content_hash(&body);
            task.body = body;
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            self.emit(event_type::TASK_UPDATED, &task, serde_json::json!({"field": "body"}));
            Ok(task)
        })
    }

    fn add_dep(&self, id: &TaskId, blocker: &TaskId) -> Result<Task, StoreError> {
        if self.find_card(blocker)?.is_none() {
            return Err(StoreError::MissingDependency(*blocker));
        }
        if self.would_create_cycle(id, blocker)? {
            return Err(StoreError::DependencyCycle(*id, *blocker));
        }
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            if !task.depends_on.contains(blocker) {
                task.depends_on.push(*blocker);
            }
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            self.emit(event_type::TASK_UPDATED, &task, serde_json::json!({"field": "dependsOn"}));
            Ok(task)
        })
    }

    fn remove_dep(&self, id: &TaskId, blocker: &TaskId) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            task.depends_on.retain(|d| d != blocker);
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            self.emit(event_type::TASK_UPDATED, &task, serde_json::json!({"field": "dependsOn"}));
            Ok(task)
        })
    }

    fn write_task_output(&self, id: &TaskId, filename: &str, contents: &[u8]) -> Result<(), StoreError> {
        let (status, _path, task) = self.require_card(id)?;
        let outputs_dir = self.working_dir(status, &task.id).join("outputs");
        fs::create_dir_all(&outputs_dir)?;
        fs::write(outputs_dir.join(filename), contents)?;
        Ok(())
    }

    fn count_by_status(&self) -> Result<HashMap<TaskStatus, usize>, StoreError> {
        let mut out = HashMap::new();
        for status in TaskStatus::all() {
            let dir = self.status_dir(status);
            let count = fs::read_dir(&dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("md"))
                        .count()
                })
                .unwrap_or(0);
            out.insert(status, count);
        }
        Ok(out)
    }

    fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        self.locks.with_lock(*id, || {
            let Some((status, path, _task)) = self.find_card(id)? else { return Ok(false) };
            fs::remove_file(&path)?;
            let dir = self.working_dir(status, id);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            Ok(true)
        })
    }

    fn task_dir(&self, id: &TaskId, status: TaskStatus) -> PathBuf {
        self.working_dir(status, id)
    }

    fn register_transition_hook(&self, hook: TransitionHook) {
        self.hooks.lock().push(hook);
    }

    fn acquire_lease(
        &self,
        id: &TaskId,
        agent: &AgentId,
        ttl: std::time::Duration,
    ) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (from, _path, mut task) = self.require_card(id)?;
            if !TaskStatus::can_transition(from, TaskStatus::InProgress) {
                return Err(if from.is_terminal() {
                    StoreError::Terminal(*id)
                } else {
                    StoreError::IllegalTransition(from, TaskStatus::InProgress)
                });
            }
            let now = self.clock.now();
            let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
            task.lease = Some(aof_core::Lease {
                agent: agent.clone(),
                acquired_at: now,
                expires_at,
                renew_count: 0,
            });
            task.status = TaskStatus::InProgress;
            task.updated_at = now;
            task.last_transition_at = now;
            task.set_metadata("lastActor", agent.to_string());
            self.relocate(id, from, TaskStatus::InProgress, &task)?;
            self.write_run_info(
                TaskStatus::InProgress,
                &RunInfo {
                    task_id: *id,
                    agent_id: agent.clone(),
                    started_at: now,
                    status: RunStatus::Running,
                    artifact_paths: Vec::new(),
                    metadata: Default::default(),
                },
            )?;
            self.emit(
                event_type::TASK_TRANSITIONED,
                &task,
                serde_json::json!({"from": from.to_string(), "to": "in-progress", "agent": agent.to_string()}),
            );
            self.run_hooks(&task, from, TaskStatus::InProgress);
            Ok(task)
        })
    }

    fn renew_lease(&self, id: &TaskId, ttl: std::time::Duration) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            let now = self.clock.now();
            let lease = task
                .lease
                .as_mut()
                .ok_or_else(|| StoreError::Corruption(format!("task {id} has no active lease to renew")))?;
            lease.expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
            lease.renew_count += 1;
            task.updated_at = now;
            self.persist(status, &task)?;
            Ok(task)
        })
    }

    fn release_lease(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            task.lease = None;
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            Ok(task)
        })
    }

    fn expired_leases(&self, now: chrono::DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let dir = self.status_dir(TaskStatus::InProgress);
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(&dir) else { return Ok(out) };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let task = task_file::decode(&raw)?;
            if let Some(lease) = &task.lease {
                if !lease.is_active(now) {
                    out.push(task);
                }
            }
        }
        Ok(out)
    }

    fn merge_metadata(
        &self,
        id: &TaskId,
        updates: HashMap<String, serde_json::Value>,
    ) -> Result<Task, StoreError> {
        self.locks.with_lock(*id, || {
            let (status, _path, mut task) = self.require_card(id)?;
            task.metadata.extend(updates);
            task.updated_at = self.clock.now();
            self.persist(status, &task)?;
            Ok(task)
        })
    }
}

fn content_hash(body: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    body.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
