// SPDX-License-Identifier: MIT

use aof_storage::{CreateTaskInput, TaskStore};
use tempfile::tempdir;

use super::{open_store, registry};

#[test]
fn open_store_creates_every_status_directory() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "_inbox").unwrap();
    let task = store.create(CreateTaskInput { title: "t".into(), ..Default::default() }).unwrap();
    assert_eq!(task.project, "_inbox");

    for status in aof_core::TaskStatus::all() {
        assert!(dir.path().join("projects/_inbox/tasks").join(status.dir_name()).is_dir());
    }
}

#[test]
fn registry_discovers_inbox_even_with_nothing_on_disk() {
    let dir = tempdir().unwrap();
    let registry = registry(dir.path()).unwrap();
    let projects = registry.list(false).unwrap();
    assert!(projects.iter().any(|p| p.id.is_inbox()));
}
