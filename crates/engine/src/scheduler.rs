// SPDX-License-Identifier: MIT

//! The poll loop: turn a store snapshot into a bounded list of
//! actions, then execute each one, revalidating at execution time so a
//! status drift since planning is dropped silently rather than acted on.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aof_adapters::ExecutorAdapter;
use aof_core::{event_type, Clock, ProjectId, Task, TaskId, TaskStatus};
use aof_storage::{EventLog, StoreError, TaskStore};
use chrono::Duration as ChronoDuration;

use crate::dispatch::{DispatchError, DispatchOutcome, Dispatcher};
use crate::lease::LeaseManager;
use crate::throttle;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_dispatches: u32,
    pub min_dispatch_interval: ChronoDuration,
    pub max_dispatches_per_poll: u32,
    pub default_lease_ttl: Duration,
    pub heartbeat_ttl: Duration,
    pub spawn_timeout: Duration,
    pub max_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: 4,
            min_dispatch_interval: ChronoDuration::seconds(5),
            max_dispatches_per_poll: 4,
            default_lease_ttl: Duration::from_secs(15 * 60),
            heartbeat_ttl: Duration::from_secs(60),
            spawn_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// One poll's worth of planned work, before execution-time revalidation.
#[derive(Debug, Clone)]
pub enum Action {
    Assign(TaskId),
    ExpireLease(TaskId),
    StaleHeartbeat(TaskId),
    SlaBreach(TaskId),
    DependencySatisfied(TaskId),
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct Scheduler<C: Clock + 'static> {
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn ExecutorAdapter>,
    event_log: Arc<EventLog>,
    lease: Arc<LeaseManager<C>>,
    clock: C,
    project_id: ProjectId,
    project_root: String,
    config: SchedulerConfig,
    effective_cap: Arc<AtomicU32>,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        store: Arc<dyn TaskStore>,
        executor: Arc<dyn ExecutorAdapter>,
        event_log: Arc<EventLog>,
        clock: C,
        project_id: ProjectId,
        project_root: String,
        config: SchedulerConfig,
    ) -> Self {
        let lease = Arc::new(LeaseManager::new(store.clone(), clock.clone(), config.default_lease_ttl));
        let effective_cap = Arc::new(AtomicU32::new(config.max_concurrent_dispatches));
        Self { store, executor, event_log, lease, clock, project_id, project_root, config, effective_cap }
    }

    fn dispatcher(&self) -> Dispatcher<C> {
        Dispatcher {
            store: self.store.clone(),
            executor: self.executor.clone(),
            event_log: self.event_log.clone(),
            lease: self.lease.clone(),
            clock: self.clock.clone(),
            project_id: self.project_id.clone(),
            project_root: self.project_root.clone(),
            spawn_timeout: self.config.spawn_timeout,
            max_retries: self.config.max_retries,
            max_concurrency_cap: self.effective_cap.clone(),
        }
    }

    fn emit(&self, event_type: &str, task: &Task, payload: serde_json::Value) {
        let event = aof_core::Event::new(event_type, "scheduler", self.clock.now())
            .with_task(task.id)
            .with_project(self.project_id.as_str().to_string())
            .with_payload(payload);
        if let Err(err) = self.event_log.append(event, &self.clock) {
            tracing::warn!(task = %task.id, %err, "failed to append event; continuing");
        }
    }

    /// Plan this poll's actions from a store snapshot.
    pub fn plan(&self) -> Result<Vec<Action>, SchedulerError> {
        let all = self.store.list(&Default::default())?;
        let now = self.clock.now();
        let mut actions = Vec::new();

        let done: HashSet<TaskId> =
            all.iter().filter(|t| t.status == TaskStatus::Done).map(|t| t.id).collect();

        for task in &all {
            if task.status == TaskStatus::Backlog
                && !task.depends_on.is_empty()
                && task.depends_on.iter().all(|dep| done.contains(dep))
            {
                actions.push(Action::DependencySatisfied(task.id));
            }
            if let Some(sla) = &task.sla {
                let deadline = task.last_transition_at
                    + ChronoDuration::milliseconds(sla.target_ms)
                        .max(ChronoDuration::zero());
                if now > deadline && !task.is_terminal() {
                    actions.push(Action::SlaBreach(task.id));
                }
            }
        }

        for task in self.lease.expired()? {
            actions.push(Action::ExpireLease(task));
        }

        let heartbeat_ttl = self.config.heartbeat_ttl;
        for task in all.iter().filter(|t| t.status == TaskStatus::InProgress) {
            if self.heartbeat_is_stale(task, heartbeat_ttl) {
                actions.push(Action::StaleHeartbeat(task.id));
            }
        }

        let currently_in_progress =
            all.iter().filter(|t| t.status == TaskStatus::InProgress).count() as u32;
        let cap = self.effective_cap.load(Ordering::SeqCst);
        let room = cap.saturating_sub(currently_in_progress);
        let budget = room.min(self.config.max_dispatches_per_poll);

        let mut candidates: Vec<&Task> = all
            .iter()
            .filter(|t| {
                t.status == TaskStatus::Ready
                    && t.lease.is_none()
                    && t.depends_on.iter().all(|dep| done.contains(dep))
                    && t.routing.agent.is_some()
                    && t.routing
                        .team
                        .map(|team| throttle::is_ready(&team, now, self.config.min_dispatch_interval))
                        .unwrap_or(true)
            })
            .collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        candidates.truncate(budget as usize);

        actions.extend(candidates.into_iter().map(|t| Action::Assign(t.id)));
        Ok(actions)
    }

    fn heartbeat_is_stale(&self, task: &Task, ttl: Duration) -> bool {
        let dir = self.store.task_dir(&task.id, task.status);
        let path = dir.join("run_heartbeat.json");
        let Ok(raw) = std::fs::read_to_string(path) else { return false };
        let Ok(heartbeat) = serde_json::from_str::<aof_core::Heartbeat>(&raw) else { return false };
        let _ = ttl;
        heartbeat.is_stale(self.clock.now())
    }

    /// Execute one planned action, revalidating at the moment of execution
    /// so a status drift since planning is a silent no-op, not a bug.
    pub async fn execute(&self, action: Action) -> Result<(), SchedulerError> {
        match action {
            Action::Assign(id) => {
                match self.dispatcher().assign(&id).await {
                    Ok(_) => {}
                    Err(DispatchError::Store(err)) => return Err(err.into()),
                }
            }
            Action::ExpireLease(id) => self.handle_expire_lease(&id)?,
            Action::StaleHeartbeat(id) => self.handle_stale_heartbeat(&id).await?,
            Action::SlaBreach(id) => self.handle_sla_breach(&id)?,
            Action::DependencySatisfied(id) => self.handle_dependency_satisfied(&id)?,
        }
        Ok(())
    }

    fn handle_expire_lease(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let Some(task) = self.store.get(id)? else { return Ok(()) };
        if task.status != TaskStatus::InProgress {
            return Ok(());
        }
        self.lease.release(id)?;
        self.store.transition(id, TaskStatus::Ready, Some("lease_expired"), None)?;
        self.emit(event_type::TASK_TRANSITIONED, &task, serde_json::json!({"reason": "lease_expired"}));
        Ok(())
    }

    async fn handle_stale_heartbeat(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let Some(task) = self.store.get(id)? else { return Ok(()) };
        if task.status != TaskStatus::InProgress {
            return Ok(());
        }
        let correlation_id = task.metadata_str("correlationId").unwrap_or("").to_string();
        if let Some(session_id) = task.metadata_str("sessionId") {
            let _ = self.executor.force_complete(session_id, "stale_heartbeat").await;
        }

        let run_result_path = self.store.task_dir(id, task.status).join("run_result.json");
        if let Ok(raw) = std::fs::read_to_string(&run_result_path) {
            if let Ok(result) = serde_json::from_str::<aof_core::RunResult>(&raw) {
                self.apply_run_result(&task, &result)?;
            } else {
                self.reclaim_to_ready(&task)?;
            }
        } else {
            self.reclaim_to_ready(&task)?;
        }

        self.emit(
            event_type::SESSION_FORCE_COMPLETED,
            &task,
            serde_json::json!({
                "sessionId": task.metadata_str("sessionId"),
                "correlationId": correlation_id,
                "reason": "stale_heartbeat",
            }),
        );
        Ok(())
    }

    fn reclaim_to_ready(&self, task: &Task) -> Result<(), SchedulerError> {
        self.lease.release(&task.id)?;
        self.store.transition(&task.id, TaskStatus::Ready, Some("stale_heartbeat"), None)?;
        Ok(())
    }

    fn apply_run_result(&self, task: &Task, result: &aof_core::RunResult) -> Result<(), SchedulerError> {
        use aof_core::RunOutcome;
        match result.outcome {
            RunOutcome::Success => {
                self.store.transition(&task.id, TaskStatus::Done, None, None)?;
            }
            RunOutcome::Failure => {
                self.store.transition(&task.id, TaskStatus::Blocked, Some("run_failed"), None)?;
            }
            RunOutcome::Blocked => {
                self.store.transition(&task.id, TaskStatus::Blocked, Some("blocked_by_agent"), None)?;
            }
        }
        Ok(())
    }

    fn handle_sla_breach(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let Some(task) = self.store.get(id)? else { return Ok(()) };
        let Some(sla) = &task.sla else { return Ok(()) };
        use aof_core::SlaViolationAction;
        match sla.on_violation {
            SlaViolationAction::Alert => {
                self.emit(event_type::SLA_VIOLATION, &task, serde_json::json!({"action": "alert"}));
            }
            SlaViolationAction::Block => {
                self.store.transition(id, TaskStatus::Blocked, Some("sla_violation"), None)?;
                self.emit(event_type::SLA_VIOLATION, &task, serde_json::json!({"action": "block"}));
            }
            SlaViolationAction::Deadletter => {
                self.store.transition(id, TaskStatus::Deadletter, Some("sla_violation"), None)?;
                self.emit(event_type::SLA_VIOLATION, &task, serde_json::json!({"action": "deadletter"}));
            }
        }
        Ok(())
    }

    fn handle_dependency_satisfied(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let Some(task) = self.store.get(id)? else { return Ok(()) };
        if task.status != TaskStatus::Backlog {
            return Ok(());
        }
        self.store.transition(id, TaskStatus::Ready, None, None)?;
        self.emit(event_type::DEPENDENCY_SATISFIED, &task, serde_json::json!({}));
        Ok(())
    }

    /// Run one full poll: plan, then execute every action in order.
    pub async fn poll(&self) -> Result<usize, SchedulerError> {
        let actions = self.plan()?;
        let count = actions.len();
        for action in actions {
            self.execute(action).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
