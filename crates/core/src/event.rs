// SPDX-License-Identifier: MIT

//! The append-only event record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// An append-only audit record. `event_id` is monotonic per (project, day)
/// only — never globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Well-known event type names used across the scheduler, dispatcher, and
/// protocol router. Kept as plain `&str` constants (not an enum) because new
/// event types are cheap to add and the event log never pattern-matches on
/// the type with exhaustiveness in mind — it's a write-only audit trail.
pub mod event_type {
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_TRANSITIONED: &str = "task.transitioned";
    pub const TASK_UPDATED: &str = "task.updated";
    pub const TASK_BLOCKED: &str = "task.blocked";
    pub const TASK_CANCELLED: &str = "task.cancelled";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const DEPENDENCY_CASCADED: &str = "dependency.cascaded";
    pub const DEPENDENCY_SATISFIED: &str = "dependency.satisfied";
    pub const ACTION_STARTED: &str = "action.started";
    pub const ACTION_COMPLETED: &str = "action.completed";
    pub const DISPATCH_MATCHED: &str = "dispatch.matched";
    pub const DISPATCH_ERROR: &str = "dispatch.error";
    pub const DISPATCH_DEDUPED: &str = "dispatch.deduped";
    pub const CONCURRENCY_PLATFORM_LIMIT: &str = "concurrency.platformLimit";
    pub const SESSION_FORCE_COMPLETED: &str = "session.force_completed";
    pub const SLA_VIOLATION: &str = "sla.violation";
    pub const DELEGATION_REQUESTED: &str = "delegation.requested";
    pub const DELEGATION_REJECTED: &str = "delegation.rejected";
    pub const PROTOCOL_MESSAGE_REJECTED: &str = "protocol.message.rejected";
    pub const SYSTEM_CRASH_RECOVERY: &str = "system.crash_recovery";
}

impl Event {
    pub fn new(event_type: impl Into<String>, actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            event_id: 0,
            event_type: event_type.into(),
            timestamp: now,
            actor: actor.into(),
            task_id: None,
            project_id: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
