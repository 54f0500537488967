// SPDX-License-Identifier: MIT

//! Run lifecycle files written into a task's working directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{AgentId, TaskId};

/// `status` field of [`RunInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Abandoned,
}

/// `run.json` — written on lease acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(default)]
    pub artifact_paths: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `run_heartbeat.json` — periodically rewritten while a session is alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub last_heartbeat: DateTime<Utc>,
    pub beat_count: u64,
    pub expires_at: DateTime<Utc>,
}

impl Heartbeat {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a task run, reported via a `completion.report` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failure,
    Blocked,
}

/// `run_result.json` — written by the protocol router on a completion envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub task_id: TaskId,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_ref: Option<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
#[path = "run_artifact_tests.rs"]
mod tests;
