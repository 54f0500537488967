// SPDX-License-Identifier: MIT

//! The inter-agent message envelope: the wire shape every
//! message to the router must carry, independent of what `type` it is.

use aof_core::{AgentId, ProjectId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `type` discriminant for a protocol envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "status.update")]
    StatusUpdate,
    #[serde(rename = "completion.report")]
    CompletionReport,
    #[serde(rename = "handoff.request")]
    HandoffRequest,
    #[serde(rename = "handoff.accepted")]
    HandoffAccepted,
    #[serde(rename = "handoff.rejected")]
    HandoffRejected,
}

/// `{protocol:"aof", version:1, projectId, type, taskId, fromAgent, toAgent,
/// sentAt, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub protocol: String,
    pub version: u32,
    pub project_id: ProjectId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub task_id: TaskId,
    pub from_agent: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<AgentId>,
    pub sent_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn is_well_formed(&self) -> bool {
        self.protocol == "aof" && self.version == 1
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
