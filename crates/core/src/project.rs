// SPDX-License-Identifier: MIT

//! Project identity and manifest.

use serde::{Deserialize, Serialize};

/// The reserved project id that always exists, used as the landing zone
/// for tasks created without an explicit project.
pub const INBOX_PROJECT_ID: &str = "_inbox";

/// A project id. User-chosen (directory name under `projects/`), so unlike
/// [`crate::task::AgentId`]/[`crate::task::TeamId`] this stays a validated
/// `String` rather than a generated [`crate::id::IdBuf`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate and construct. Project ids are directory names: no path
    /// separators, no leading dot, non-empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err("project id must not be empty".into());
        }
        if raw.contains(['/', '\\']) || raw == "." || raw == ".." {
            return Err(format!("project id {raw:?} is not a valid directory name"));
        }
        Ok(Self(raw))
    }

    pub fn inbox() -> Self {
        Self(INBOX_PROJECT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_inbox(&self) -> bool {
        self.0 == INBOX_PROJECT_ID
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ProjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Project lifecycle status, distinct from [`crate::task::TaskStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Paused,
    Archived,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
}

/// Retention policy for a memory tier attached to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

/// How tasks landing in `_inbox` get routed into this project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRouting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_team: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

/// `project.yaml` — the manifest persisted at a project's root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    pub id: ProjectId,
    pub title: String,
    #[serde(rename = "type")]
    pub project_type: String,
    #[serde(default)]
    pub owner: ProjectOwner,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub memory_tiers: Vec<MemoryTier>,
    #[serde(default)]
    pub intake_routing: IntakeRouting,
}

impl ProjectManifest {
    pub fn inbox() -> Self {
        Self {
            id: ProjectId::inbox(),
            title: "Inbox".to_string(),
            project_type: "inbox".to_string(),
            owner: ProjectOwner::default(),
            participants: Vec::new(),
            status: ProjectStatus::Active,
            memory_tiers: Vec::new(),
            intake_routing: IntakeRouting::default(),
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
