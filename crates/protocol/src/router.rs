// SPDX-License-Identifier: MIT

//! The protocol router: resolve project → load task → per-task
//! lock → dispatch on `type`. This lock is in-process and scopes the whole
//! handler, wider than any single store mutation the handler performs.

use std::collections::HashMap;
use std::sync::Arc;

use aof_core::{event_type, AgentId, Clock, Event, ProjectId, Task, TaskId, TaskStatus};
use aof_storage::{write_handoff_artifacts, StoreError, TaskLocks, TaskStore};
use thiserror::Error;

use crate::envelope::{Envelope, MessageType};
use crate::payload::{
    CompletionOutcome, CompletionReportPayload, HandoffAckPayload, HandoffRequestPayload,
    StatusUpdatePayload,
};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),
    #[error("unknown project id: {0}")]
    InvalidProjectId(ProjectId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("delegation error: {0}")]
    Delegation(#[from] aof_storage::DelegationError),
    #[error("max delegation depth exceeded")]
    MaxDelegationDepth,
}

/// Everything the router needs for one project: its store and the event
/// log to record protocol-level events against.
#[derive(Clone)]
pub struct ProjectHandle {
    pub store: Arc<dyn TaskStore>,
    pub event_log: Arc<aof_storage::EventLog>,
}

/// Looks up a [`ProjectHandle`] by project id. `aof-daemon` implements this
/// over the project registry; tests use a static map.
pub trait ProjectResolver: Send + Sync {
    fn resolve(&self, project_id: &ProjectId) -> Option<ProjectHandle>;
}

/// A fixed table resolver, for tests and single-project setups.
#[derive(Clone, Default)]
pub struct StaticResolver(HashMap<String, ProjectHandle>);

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, project_id: ProjectId, handle: ProjectHandle) {
        self.0.insert(project_id.as_str().to_string(), handle);
    }
}

impl ProjectResolver for StaticResolver {
    fn resolve(&self, project_id: &ProjectId) -> Option<ProjectHandle> {
        self.0.get(project_id.as_str()).cloned()
    }
}

pub struct RouterConfig {
    /// Whether a `blocked` transition cascades to direct dependents still
    /// in `backlog`/`ready`.
    pub cascade_blocks: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { cascade_blocks: false }
    }
}

pub struct Router<C: Clock> {
    resolver: Arc<dyn ProjectResolver>,
    locks: TaskLocks,
    clock: C,
    config: RouterConfig,
}

impl<C: Clock> Router<C> {
    pub fn new(resolver: Arc<dyn ProjectResolver>, clock: C, config: RouterConfig) -> Self {
        Self { resolver, locks: TaskLocks::new(), clock, config }
    }

    fn emit(&self, handle: &ProjectHandle, event_type: &str, task: &Task, payload: serde_json::Value) {
        let event = Event::new(event_type, "protocol", self.clock.now())
            .with_task(task.id)
            .with_project(task.project.clone())
            .with_payload(payload);
        if let Err(err) = handle.event_log.append(event, &self.clock) {
            tracing::warn!(task = %task.id, %err, "failed to append event; continuing");
        }
    }

    fn reject_unauthorized(&self, handle: &ProjectHandle, task: &Task, reason: &'static str) -> ProtocolError {
        self.emit(
            handle,
            event_type::PROTOCOL_MESSAGE_REJECTED,
            task,
            serde_json::json!({"reason": "unauthorized", "detail": reason}),
        );
        ProtocolError::Unauthorized(reason)
    }

    /// Run the whole pipeline for one envelope.
    pub fn handle(&self, envelope: Envelope) -> Result<(), ProtocolError> {
        if !envelope.is_well_formed() {
            return Err(ProtocolError::Malformed("protocol must be \"aof\" at version 1"));
        }
        let handle = self
            .resolver
            .resolve(&envelope.project_id)
            .ok_or_else(|| ProtocolError::InvalidProjectId(envelope.project_id.clone()))?;

        self.locks.with_lock(envelope.task_id, || self.dispatch(&handle, envelope))
    }

    fn dispatch(&self, handle: &ProjectHandle, envelope: Envelope) -> Result<(), ProtocolError> {
        let task = handle
            .store
            .get(&envelope.task_id)?
            .ok_or(ProtocolError::TaskNotFound(envelope.task_id))?;

        match envelope.message_type {
            MessageType::StatusUpdate => self.handle_status_update(handle, task, envelope.payload),
            MessageType::CompletionReport => self.handle_completion_report(handle, task, envelope.payload),
            MessageType::HandoffRequest => self.handle_handoff_request(handle, task, envelope),
            MessageType::HandoffAccepted => self.handle_handoff_accepted(handle, task, envelope.payload),
            MessageType::HandoffRejected => self.handle_handoff_rejected(handle, task, envelope.payload),
        }
    }

    fn is_assigned(&self, task: &Task, agent: &AgentId) -> bool {
        task.routing.agent.as_ref() == Some(agent)
            || task.lease.as_ref().map(|l| &l.agent) == Some(agent)
    }

    fn handle_status_update(
        &self,
        handle: &ProjectHandle,
        task: Task,
        payload: serde_json::Value,
    ) -> Result<(), ProtocolError> {
        let payload: StatusUpdatePayload = serde_json::from_value(payload)?;
        if !self.is_assigned(&task, &payload.agent_id) {
            return Err(self.reject_unauthorized(handle, &task, "not the assigned agent or lease holder"));
        }

        let mut current = task;
        if let Some(status) = payload.status {
            if status != current.status {
                current = handle.store.transition(&current.id, status, None, Some(&payload.agent_id))?;
                if status == TaskStatus::Blocked && self.config.cascade_blocks {
                    self.cascade_block(handle, &current)?;
                }
            }
        }
        if let Some(note) = payload.work_log {
            let mut body = current.body.clone();
            body.push_str(&format!("\n- work log ({}): {}\n", payload.agent_id, note));
            current = handle.store.update_body(&current.id, body)?;
        }
        let _ = payload.blockers;
        let _ = current;
        Ok(())
    }

    fn cascade_block(&self, handle: &ProjectHandle, parent: &Task) -> Result<(), ProtocolError> {
        let all = handle.store.list(&Default::default())?;
        for dependent in all.iter().filter(|t| t.depends_on.contains(&parent.id)) {
            if !matches!(dependent.status, TaskStatus::Backlog | TaskStatus::Ready) {
                continue;
            }
            let reason = format!("upstream blocked: {}", parent.id);
            let blocked = handle.store.transition(&dependent.id, TaskStatus::Blocked, Some(&reason), None)?;
            self.emit(
                handle,
                event_type::DEPENDENCY_CASCADED,
                &blocked,
                serde_json::json!({"upstream": parent.id.to_string()}),
            );
        }
        Ok(())
    }

    fn handle_completion_report(
        &self,
        handle: &ProjectHandle,
        task: Task,
        payload: serde_json::Value,
    ) -> Result<(), ProtocolError> {
        let payload: CompletionReportPayload = serde_json::from_value(payload)?;
        if !self.is_assigned(&task, &payload.agent_id) {
            return Err(self.reject_unauthorized(handle, &task, "not the assigned agent or lease holder"));
        }

        let run_outcome = match payload.outcome {
            CompletionOutcome::Complete | CompletionOutcome::NeedsReview => aof_core::RunOutcome::Success,
            CompletionOutcome::Blocked => aof_core::RunOutcome::Blocked,
        };
        let run_result = aof_core::RunResult {
            task_id: task.id,
            outcome: run_outcome,
            summary_ref: None,
            deliverables: Vec::new(),
            tests: Vec::new(),
            blockers: payload.blockers.clone(),
            notes: payload.summary.clone(),
        };
        let dir = handle.store.task_dir(&task.id, task.status);
        std::fs::create_dir_all(&dir).map_err(StoreError::Io)?;
        std::fs::write(dir.join("run_result.json"), serde_json::to_vec_pretty(&run_result)?).map_err(StoreError::Io)?;

        let target = match payload.outcome {
            CompletionOutcome::Complete => TaskStatus::Done,
            CompletionOutcome::NeedsReview => TaskStatus::Review,
            CompletionOutcome::Blocked => TaskStatus::Blocked,
        };
        let mut updated = handle.store.transition(&task.id, target, None, Some(&payload.agent_id))?;
        if !payload.blockers.is_empty() {
            let mut updates = HashMap::new();
            updates.insert("blockers".to_string(), serde_json::json!(payload.blockers));
            updated = handle.store.merge_metadata(&task.id, updates)?;
        }
        self.emit(handle, event_type::TASK_COMPLETED, &updated, serde_json::json!({"outcome": payload.outcome}));
        Ok(())
    }

    fn handle_handoff_request(
        &self,
        handle: &ProjectHandle,
        task: Task,
        envelope: Envelope,
    ) -> Result<(), ProtocolError> {
        let payload: HandoffRequestPayload = serde_json::from_value(envelope.payload)?;
        if payload.task_id != envelope.task_id {
            return Err(ProtocolError::Malformed("payload taskId must equal envelope taskId"));
        }

        let parent = handle
            .store
            .get(&payload.request.parent_task_id)?
            .ok_or(ProtocolError::TaskNotFound(payload.request.parent_task_id))?;
        let parent_depth = parent
            .metadata
            .get("delegationDepth")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if parent_depth + 1 > 1 {
            self.emit(
                handle,
                event_type::DELEGATION_REJECTED,
                &task,
                serde_json::json!({
                    "reason": "nested_delegation",
                    "parentTaskId": payload.request.parent_task_id.to_string(),
                }),
            );
            return Err(ProtocolError::MaxDelegationDepth);
        }

        let patch = aof_storage::UpdateTaskPatch {
            routing: Some(aof_core::Routing {
                agent: Some(payload.request.to_agent),
                ..task.routing.clone()
            }),
            ..Default::default()
        };
        handle.store.update(&task.id, patch)?;
        let mut updates = HashMap::new();
        updates.insert("delegationDepth".to_string(), serde_json::json!(parent_depth + 1));
        let updated = handle.store.merge_metadata(&task.id, updates)?;

        let dir = handle.store.task_dir(&task.id, updated.status);
        write_handoff_artifacts(&dir, &payload.request)?;

        self.emit(
            handle,
            event_type::DELEGATION_REQUESTED,
            &updated,
            serde_json::json!({"parentTaskId": payload.request.parent_task_id.to_string()}),
        );
        Ok(())
    }

    fn handle_handoff_accepted(
        &self,
        handle: &ProjectHandle,
        task: Task,
        payload: serde_json::Value,
    ) -> Result<(), ProtocolError> {
        let payload: HandoffAckPayload = serde_json::from_value(payload)?;
        if !self.is_assigned(&task, &payload.agent_id) {
            return Err(self.reject_unauthorized(handle, &task, "only the receiving agent may accept a handoff"));
        }
        Ok(())
    }

    fn handle_handoff_rejected(
        &self,
        handle: &ProjectHandle,
        task: Task,
        payload: serde_json::Value,
    ) -> Result<(), ProtocolError> {
        let payload: HandoffAckPayload = serde_json::from_value(payload)?;
        if !self.is_assigned(&task, &payload.agent_id) {
            return Err(self.reject_unauthorized(handle, &task, "only the receiving agent may reject a handoff"));
        }
        let reason = payload.reason.unwrap_or_else(|| "handoff rejected".to_string());
        let blocked = handle.store.transition(&task.id, TaskStatus::Blocked, Some(&reason), Some(&payload.agent_id))?;
        self.emit(handle, event_type::DELEGATION_REJECTED, &blocked, serde_json::json!({"reason": reason}));
        Ok(())
    }

    /// Session-end hook: scan `in-progress` tasks and finalize
    /// any with a pending `run_result.json` the executor already wrote.
    pub fn on_session_ended(&self, handle: &ProjectHandle) -> Result<usize, ProtocolError> {
        use aof_core::RunOutcome;
        let mut finalized = 0;
        for task in handle.store.list(&aof_storage::ListFilter {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        })? {
            let path = handle.store.task_dir(&task.id, task.status).join("run_result.json");
            let Ok(raw) = std::fs::read_to_string(&path) else { continue };
            let Ok(result) = serde_json::from_str::<aof_core::RunResult>(&raw) else { continue };
            let target = match result.outcome {
                RunOutcome::Success => TaskStatus::Done,
                RunOutcome::Failure | RunOutcome::Blocked => TaskStatus::Blocked,
            };
            handle.store.transition(&task.id, target, Some("session_ended"), None)?;
            finalized += 1;
        }
        Ok(finalized)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
