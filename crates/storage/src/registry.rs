// SPDX-License-Identifier: MIT

//! Project discovery. Walks `projects/`, parses each
//! `project.yaml`, and always reports the reserved `_inbox` project even
//! when it has no manifest on disk yet.

use std::fs;
use std::path::{Path, PathBuf};

use aof_core::{ProjectId, ProjectManifest, ProjectStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One discovered project: either a parsed manifest, or the parse error
/// encountered while reading it (a malformed manifest must not prevent
/// discovery of the other projects).
#[derive(Debug)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub path: PathBuf,
    pub manifest: Result<ProjectManifest, String>,
}

impl ProjectRecord {
    pub fn is_archived(&self) -> bool {
        matches!(&self.manifest, Ok(m) if m.status == ProjectStatus::Archived)
    }
}

/// Discovers projects under a data root's `projects/` subdirectory.
pub struct Registry {
    projects_dir: PathBuf,
}

impl Registry {
    pub fn open(data_root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let projects_dir = data_root.into().join("projects");
        fs::create_dir_all(&projects_dir)?;
        Ok(Self { projects_dir })
    }

    pub fn project_dir(&self, id: &ProjectId) -> PathBuf {
        self.projects_dir.join(id.as_str())
    }

    /// List every discoverable project. `_inbox` is always included, even
    /// if it has no directory yet, as a synthesized record. Archived
    /// projects are omitted unless `include_archived` is set.
    pub fn list(&self, include_archived: bool) -> Result<Vec<ProjectRecord>, RegistryError> {
        let mut out = Vec::new();
        let mut saw_inbox = false;

        for entry in fs::read_dir(&self.projects_dir)?.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Ok(id) = ProjectId::new(name) else { continue };
            if id.is_inbox() {
                saw_inbox = true;
            }
            let manifest = load_manifest(&path);
            out.push(ProjectRecord { id, path, manifest });
        }

        if !saw_inbox {
            let inbox_path = self.project_dir(&ProjectId::inbox());
            out.push(ProjectRecord {
                id: ProjectId::inbox(),
                path: inbox_path,
                manifest: Ok(ProjectManifest::inbox()),
            });
        }

        if !include_archived {
            out.retain(|record| !record.is_archived());
        }

        out.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(out)
    }

    /// Resolve a single project by id, synthesizing `_inbox` if absent.
    pub fn get(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RegistryError> {
        let path = self.project_dir(id);
        if !path.exists() {
            if id.is_inbox() {
                return Ok(Some(ProjectRecord {
                    id: id.clone(),
                    path,
                    manifest: Ok(ProjectManifest::inbox()),
                }));
            }
            return Ok(None);
        }
        Ok(Some(ProjectRecord { id: id.clone(), path: path.clone(), manifest: load_manifest(&path) }))
    }
}

fn load_manifest(project_path: &Path) -> Result<ProjectManifest, String> {
    let manifest_path = project_path.join("project.yaml");
    let raw = fs::read_to_string(&manifest_path).map_err(|e| e.to_string())?;
    serde_yaml::from_str(&raw).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
