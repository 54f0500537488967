// SPDX-License-Identifier: MIT

//! Parent-child delegation: pointer-file projection and handoff artifacts.
//! Pointer files are a rebuildable VIEW over `parentId`
//! links, never authoritative — running [`sync_delegation`] twice on
//! unchanged state must produce byte-identical files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use aof_core::{AgentId, Priority, Task, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task_store::TaskStore;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] crate::task_store::StoreError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChildPointerHeader<'a> {
    id: &'a TaskId,
    title: &'a str,
    status: TaskStatus,
    priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a AgentId>,
    parent_id: &'a TaskId,
}

fn render_pointer(
    parent_id: &TaskId,
    child: &Task,
    card_relpath: &str,
    handoff_relpath: &str,
) -> Result<String, DelegationError> {
    let header = ChildPointerHeader {
        id: &child.id,
        title: &child.title,
        status: child.status,
        priority: child.priority,
        agent: child.routing.agent.as_ref(),
        parent_id,
    };
    let yaml = serde_yaml::to_string(&header)?;
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(yaml.trim_end());
    out.push_str("\n---\n");
    out.push_str(&format!("Task card: {card_relpath}\n"));
    out.push_str(&format!("Handoff artifact: {handoff_relpath}\n"));
    Ok(out)
}

/// Rebuild every parent's `subtasks/` pointer-file view from the current
/// `parentId` links in the store. Idempotent: an unchanged child leaves
/// its pointer file's bytes untouched; orphaned pointers (child moved,
/// deleted, or re-parented) are pruned.
pub fn sync_delegation(store: &dyn TaskStore) -> Result<(), DelegationError> {
    let all = store.list(&Default::default())?;

    let mut children_by_parent: HashMap<TaskId, Vec<&Task>> = HashMap::new();
    for task in &all {
        if let Some(parent_id) = task.parent_id {
            children_by_parent.entry(parent_id).or_default().push(task);
        }
    }

    for (parent_id, children) in &children_by_parent {
        let Some(parent) = all.iter().find(|t| t.id == *parent_id) else { continue };
        let parent_dir = store.task_dir(&parent.id, parent.status);
        let subtasks_dir = parent_dir.join("subtasks");
        fs::create_dir_all(&subtasks_dir)?;

        let mut live: HashSet<String> = HashSet::new();
        for child in children {
            let pointer_name = format!("{}.md", child.id);
            live.insert(pointer_name.clone());

            let card_relpath = format!("../../{}/{}.md", child.status.dir_name(), child.id);
            let handoff_relpath =
                format!("../../{}/{}/inputs/handoff.md", child.status.dir_name(), child.id);
            let rendered = render_pointer(parent_id, child, &card_relpath, &handoff_relpath)?;

            let pointer_path = subtasks_dir.join(&pointer_name);
            let unchanged = fs::read_to_string(&pointer_path)
                .map(|existing| existing == rendered)
                .unwrap_or(false);
            if !unchanged {
                crate::task_file::write_atomic(&pointer_path, &rendered)?;
            }
        }

        for entry in fs::read_dir(&subtasks_dir)?.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !live.contains(&name) {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    Ok(())
}

/// Payload of a `handoff.request` protocol envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRequest {
    pub parent_task_id: TaskId,
    pub to_agent: AgentId,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub expected_outputs: Vec<String>,
    #[serde(default)]
    pub context_refs: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_by: Option<DateTime<Utc>>,
}

/// Write `inputs/handoff.json` and `inputs/handoff.md` under a child's
/// working directory, as required when the router accepts a
/// `handoff.request` envelope.
pub fn write_handoff_artifacts(child_dir: &Path, request: &HandoffRequest) -> Result<(), DelegationError> {
    let inputs_dir = child_dir.join("inputs");
    fs::create_dir_all(&inputs_dir)?;

    let json = serde_json::to_string_pretty(request)?;
    crate::task_file::write_atomic(&inputs_dir.join("handoff.json"), &json)?;

    let markdown = render_handoff_markdown(request);
    crate::task_file::write_atomic(&inputs_dir.join("handoff.md"), &markdown)?;

    Ok(())
}

fn render_handoff_markdown(request: &HandoffRequest) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Handoff from {}\n\n", request.parent_task_id));
    out.push_str(&format!("Assigned to: {}\n\n", request.to_agent));
    if let Some(due) = request.due_by {
        out.push_str(&format!("Due by: {}\n\n", due.to_rfc3339()));
    }
    out.push_str("## Acceptance criteria\n");
    for item in &request.acceptance_criteria {
        out.push_str(&format!("- {item}\n"));
    }
    out.push_str("\n## Expected outputs\n");
    for item in &request.expected_outputs {
        out.push_str(&format!("- {item}\n"));
    }
    out.push_str("\n## Context\n");
    for item in &request.context_refs {
        out.push_str(&format!("- {item}\n"));
    }
    out.push_str("\n## Constraints\n");
    for item in &request.constraints {
        out.push_str(&format!("- {item}\n"));
    }
    out
}

#[cfg(test)]
#[path = "delegation_tests.rs"]
mod tests;
