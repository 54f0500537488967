// SPDX-License-Identifier: MIT

//! The task entity: identity, state machine, lease, and routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::clock::Clock;
use crate::id::{IdBuf, ID_MAX_LEN};

crate::define_id! {
    /// Opaque identifier for an agent.
    pub struct AgentId("agt-");
}

crate::define_id! {
    /// Opaque identifier for a team.
    pub struct TeamId("team-");
}

/// Time-sortable task identifier: `{YYYYMMDDTHHMMSSZ}-{6 char suffix}`.
///
/// The date prefix makes ids sort chronologically by creation time even
/// across processes with no shared counter; the random suffix disambiguates
/// tasks created within the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub IdBuf);

impl TaskId {
    /// Generate a new id anchored to the given instant.
    pub fn generate(clock: &impl Clock) -> Self {
        let ts = clock.now().format("%Y%m%dT%H%M%SZ");
        let suffix = nanoid::nanoid!(6, &nanoid::alphabet::SAFE[2..8]);
        let raw = format!("{ts}-{suffix}");
        debug_assert!(raw.len() <= ID_MAX_LEN);
        Self(IdBuf::new(&raw))
    }

    pub fn from_string(s: impl AsRef<str>) -> Self {
        Self(IdBuf::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Task priority. Derived ordering follows declaration order, so
/// `Priority::Critical > Priority::High` etc. holds for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

crate::simple_display! {
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Critical => "critical",
    }
}

/// The task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    Ready,
    InProgress,
    Blocked,
    Review,
    Done,
    Cancelled,
    Deadletter,
}

crate::simple_display! {
    TaskStatus {
        Backlog => "backlog",
        Ready => "ready",
        InProgress => "in-progress",
        Blocked => "blocked",
        Review => "review",
        Done => "done",
        Cancelled => "cancelled",
        Deadletter => "deadletter",
    }
}

impl TaskStatus {
    /// The directory name this status lives under (invariant 1 in §3.1:
    /// the containing directory must equal the status).
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Ready => "ready",
            Self::InProgress => "in-progress",
            Self::Blocked => "blocked",
            Self::Review => "review",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Deadletter => "deadletter",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Some(match name {
            "backlog" => Self::Backlog,
            "ready" => Self::Ready,
            "in-progress" => Self::InProgress,
            "blocked" => Self::Blocked,
            "review" => Self::Review,
            "done" => Self::Done,
            "cancelled" => Self::Cancelled,
            "deadletter" => Self::Deadletter,
            _ => return None,
        })
    }

    pub fn all() -> [Self; 8] {
        [
            Self::Backlog,
            Self::Ready,
            Self::InProgress,
            Self::Blocked,
            Self::Review,
            Self::Done,
            Self::Cancelled,
            Self::Deadletter,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Deadletter)
    }

    /// The state-machine edges. `cancel`, `block`, and `deadletter` apply
    /// from any non-terminal state rather than a fixed enumerable source
    /// set — deadletter in particular is reached by SLA enforcement from
    /// whatever status a task happens to be sitting in when it breaches.
    /// `cancel` and `block` also have dedicated predicates, see
    /// [`Self::can_cancel`] and [`Self::can_block`].
    pub fn can_transition(from: Self, to: Self) -> bool {
        use TaskStatus::*;
        if from.is_terminal() {
            return false;
        }
        match (from, to) {
            (Backlog, Ready) => true,
            (Ready, InProgress) => true,
            (InProgress, Review) => true,
            (InProgress, Done) => true,
            (Review, Done) => true,
            (Blocked, Ready) => true,
            (_, Deadletter) => true,
            (_, Cancelled) => true,
            (_, Blocked) => true,
            _ => false,
        }
    }

    pub fn can_cancel(from: Self) -> bool {
        !from.is_terminal()
    }

    pub fn can_block(from: Self) -> bool {
        !from.is_terminal()
    }
}

/// Workflow checkpoint attached to a task, requiring an outcome on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub checkpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Action to take when a task's SLA target is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaViolationAction {
    Alert,
    Block,
    Deadletter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sla {
    /// Target time-in-status, in milliseconds.
    pub target_ms: i64,
    pub on_violation: SlaViolationAction,
}

/// Agent/team/role/tag routing hints for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// A time-bounded exclusive claim on one task by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub agent: AgentId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub renew_count: u32,
}

impl Lease {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A single task: one Markdown file, header + body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Routing::is_empty_ref")]
    pub routing: Routing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_runbook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<Sla>,
    #[serde(default)]
    pub content_hash: String,
    /// Unknown header fields, preserved verbatim for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// The Markdown body. Not part of the header; carried alongside it so
    /// the store can serialize header+body back into one file.
    #[serde(skip)]
    pub body: String,
}

impl Routing {
    fn is_empty_ref(&self) -> bool {
        self.agent.is_none() && self.team.is_none() && self.role.is_none() && self.tags.is_empty()
    }
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn retry_count(&self) -> u32 {
        self.metadata
            .get("retryCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            project: String = "_inbox",
            title: String = "test task",
            created_by: String = "test",
            content_hash: String = "",
        }
        set {
            status: TaskStatus = TaskStatus::Backlog,
            priority: Priority = Priority::Normal,
            routing: Routing = Routing::default(),
            lease: Option<Lease> = None,
            depends_on: Vec<TaskId> = Vec::new(),
            parent_id: Option<TaskId> = None,
            metadata: HashMap<String, serde_json::Value> = HashMap::new(),
            gate: Option<Gate> = None,
            required_runbook: Option<String> = None,
            instructions_ref: Option<String> = None,
            guidance_ref: Option<String> = None,
            sla: Option<Sla> = None,
            extra: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
            body: String = String::new(),
        }
        computed {
            id: TaskId = TaskId::generate(&crate::clock::SystemClock),
            created_at: DateTime<Utc> = Utc::now(),
            updated_at: DateTime<Utc> = Utc::now(),
            last_transition_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
