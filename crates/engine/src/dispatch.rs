// SPDX-License-Identifier: MIT

//! Assign-execution algorithm: the nine steps that take a
//! `ready` task from planning to a running (or failed, or deadlettered)
//! dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aof_adapters::{classify_error, ExecutorAdapter, FailureClass, SpawnOptions, TaskContext};
use aof_core::{event_type, Clock, ProjectId, Task, TaskId, TaskStatus};
use aof_storage::{EventLog, StoreError, TaskStore};
use uuid::Uuid;

use crate::lease::LeaseManager;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What happened when the dispatcher tried to assign a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Status had already drifted by execution time.
    Deduped,
    Matched { session_id: String, correlation_id: String },
    PlatformLimited { new_cap: u32 },
    Failed { class: FailureClassLabel, target: TaskStatus },
}

/// `FailureClass` isn't `Copy`-friendly for public API ergonomics beyond
/// the adapters crate, so outcomes carry a plain label instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassLabel {
    RateLimited,
    Timeout,
    TransientNetwork,
    Permanent,
    Unknown,
}

impl From<FailureClass> for FailureClassLabel {
    fn from(class: FailureClass) -> Self {
        match class {
            FailureClass::RateLimited => Self::RateLimited,
            FailureClass::Timeout => Self::Timeout,
            FailureClass::TransientNetwork => Self::TransientNetwork,
            FailureClass::Permanent => Self::Permanent,
            FailureClass::Unknown => Self::Unknown,
        }
    }
}

pub struct Dispatcher<C: Clock> {
    pub store: Arc<dyn TaskStore>,
    pub executor: Arc<dyn ExecutorAdapter>,
    pub event_log: Arc<EventLog>,
    pub lease: Arc<LeaseManager<C>>,
    pub clock: C,
    pub project_id: ProjectId,
    pub project_root: String,
    pub spawn_timeout: Duration,
    pub max_retries: u32,
    pub max_concurrency_cap: Arc<std::sync::atomic::AtomicU32>,
}

impl<C: Clock + 'static> Dispatcher<C> {
    fn emit(&self, event_type: &str, task: &Task, payload: serde_json::Value) {
        let event = aof_core::Event::new(event_type, "scheduler", self.clock.now())
            .with_task(task.id)
            .with_project(self.project_id.as_str().to_string())
            .with_payload(payload);
        if let Err(err) = self.event_log.append(event, &self.clock) {
            tracing::warn!(task = %task.id, %err, "failed to append event; continuing");
        }
    }

    /// Run the full assign algorithm against one task.
    pub async fn assign(&self, task_id: &TaskId) -> Result<DispatchOutcome, DispatchError> {
        // Step 1: re-fetch, dedup on status/lease drift.
        let task = match self.store.get(task_id)? {
            Some(t) if t.status == TaskStatus::Ready && t.lease.is_none() => t,
            Some(t) => {
                self.emit(event_type::DISPATCH_DEDUPED, &t, serde_json::json!({}));
                return Ok(DispatchOutcome::Deduped);
            }
            None => return Ok(DispatchOutcome::Deduped),
        };

        // Step 2.
        self.emit(event_type::ACTION_STARTED, &task, serde_json::json!({"action": "assign"}));

        // Step 3: fresh correlation id, persisted before the lease is touched.
        let correlation_id = Uuid::new_v4().to_string();
        let mut metadata = HashMap::new();
        metadata.insert("correlationId".to_string(), serde_json::json!(correlation_id));
        self.store.merge_metadata(task_id, metadata)?;

        // Step 4: acquire lease, ready -> in-progress.
        let Some(agent) = task.routing.agent else {
            // No resolvable agent: nothing to dispatch, treat as deduped rather
            // than erroring the whole poll.
            self.emit(event_type::DISPATCH_DEDUPED, &task, serde_json::json!({"reason": "no agent"}));
            return Ok(DispatchOutcome::Deduped);
        };
        self.lease.acquire(task_id, &agent)?;
        let task = self.store.get(task_id)?.ok_or(StoreError::NotFound(task_id.to_string()))?;

        // Step 5: build context.
        let ctx = TaskContext {
            task_id: task.id,
            task_path: self.store.task_dir(&task.id, task.status).to_string_lossy().into_owned(),
            agent: Some(agent),
            priority: task.priority,
            routing: task.routing.clone(),
            project_id: self.project_id.clone(),
            project_root: self.project_root.clone(),
            task_relpath: format!("{}/{}.md", task.status.dir_name(), task.id),
            gate_context: task.gate.clone(),
        };
        let opts = SpawnOptions { timeout: self.spawn_timeout, correlation_id: correlation_id.clone() };

        // Step 6.
        let result = self
            .executor
            .spawn(ctx, opts)
            .await
            .unwrap_or_else(|err| aof_adapters::SpawnResult::failed(err.to_string()));

        if result.success {
            // Step 7.
            let session_id = result.session_id.unwrap_or_default();
            let mut metadata = HashMap::new();
            metadata.insert("sessionId".to_string(), serde_json::json!(session_id));
            self.store.merge_metadata(task_id, metadata)?;
            self.emit(
                event_type::DISPATCH_MATCHED,
                &task,
                serde_json::json!({"correlationId": correlation_id, "sessionId": session_id}),
            );
            self.lease.spawn_renewal_loop(task.id);
            if let Some(team) = task.routing.team {
                crate::throttle::record(&team, self.clock.now());
            }
            self.emit(event_type::ACTION_COMPLETED, &task, serde_json::json!({"success": true}));
            return Ok(DispatchOutcome::Matched { session_id, correlation_id });
        }

        if let Some(platform_limit) = result.platform_limit {
            // Step 8: lower the cap, release the lease, no retry increment.
            let new_cap = platform_limit.min(
                self.max_concurrency_cap.load(std::sync::atomic::Ordering::SeqCst),
            );
            self.max_concurrency_cap.store(new_cap, std::sync::atomic::Ordering::SeqCst);
            self.lease.release(task_id)?;
            self.store.transition(task_id, TaskStatus::Ready, None, None)?;
            self.emit(
                event_type::CONCURRENCY_PLATFORM_LIMIT,
                &task,
                serde_json::json!({"platformLimit": platform_limit}),
            );
            return Ok(DispatchOutcome::PlatformLimited { new_cap });
        }

        // Step 9: classify and transition.
        let error_message = result.error.unwrap_or_else(|| "unknown executor failure".to_string());
        let class = classify_error(&error_message, false);
        let retry_count = task.metadata.get("retryCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let target = if class.is_terminal(retry_count, self.max_retries) {
            TaskStatus::Deadletter
        } else {
            TaskStatus::Blocked
        };

        let mut metadata = HashMap::new();
        metadata.insert("retryCount".to_string(), serde_json::json!(retry_count + 1));
        metadata.insert("lastError".to_string(), serde_json::json!(error_message));
        metadata.insert("errorClass".to_string(), serde_json::json!(label_str(class)));
        self.store.merge_metadata(task_id, metadata)?;
        self.store.transition(task_id, target, Some("dispatch_failed"), None)?;

        self.emit(
            event_type::DISPATCH_ERROR,
            &task,
            serde_json::json!({
                "agent": agent.to_string(),
                "error": error_message,
                "correlationId": correlation_id,
            }),
        );
        self.emit(event_type::ACTION_COMPLETED, &task, serde_json::json!({"success": false}));

        Ok(DispatchOutcome::Failed { class: class.into(), target })
    }
}

fn label_str(class: FailureClass) -> &'static str {
    match class {
        FailureClass::RateLimited => "rate_limited",
        FailureClass::Timeout => "timeout",
        FailureClass::TransientNetwork => "transient_network",
        FailureClass::Permanent => "permanent",
        FailureClass::Unknown => "unknown",
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
