// SPDX-License-Identifier: MIT

use super::*;
use aof_adapters::NoopExecutorAdapter;
use aof_core::{FakeClock, TaskStatus};
use tempfile::tempdir;

fn set(dir: &std::path::Path) -> ProjectSet<FakeClock> {
    ProjectSet::open(dir, FakeClock::new(), Arc::new(NoopExecutorAdapter), SchedulerConfig::default())
        .expect("open project set")
}

#[test]
fn refresh_discovers_inbox_even_with_no_manifest() {
    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    let opened = set.refresh().expect("refresh");
    assert_eq!(opened, 1);
    assert_eq!(set.runtimes().len(), 1);
}

#[test]
fn refresh_is_idempotent_once_a_project_is_open() {
    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    assert_eq!(set.refresh().expect("refresh"), 1);
    assert_eq!(set.refresh().expect("refresh"), 0);
}

#[test]
fn resolve_opens_a_project_on_demand() {
    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    let inbox = ProjectId::inbox();
    assert!(set.resolve(&inbox).is_some());
    assert_eq!(set.runtimes().len(), 1);
}

#[test]
fn resolve_rejects_a_project_id_with_no_directory_on_disk() {
    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    let bogus = ProjectId::new("bogus").expect("project id");
    assert!(set.resolve(&bogus).is_none());
}

#[test]
fn resolve_opens_a_project_with_an_existing_directory_but_no_manifest_yet() {
    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    let demo = ProjectId::new("demo").expect("project id");
    std::fs::create_dir_all(dir.path().join("projects").join("demo")).expect("mkdir");
    assert!(set.resolve(&demo).is_some());
}

#[test]
fn a_transition_refreshes_the_parents_subtasks_pointer_view() {
    use aof_storage::CreateTaskInput;

    let dir = tempdir().expect("tempdir");
    let set = set(dir.path());
    let inbox = ProjectId::inbox();
    let handle = set.resolve(&inbox).expect("inbox opens");

    let parent = handle
        .store
        .create(CreateTaskInput { title: "parent".into(), created_by: "t".into(), ..Default::default() })
        .expect("create parent");
    let child = handle
        .store
        .create(CreateTaskInput {
            title: "child".into(),
            created_by: "t".into(),
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .expect("create child");

    handle.store.transition(&child.id, TaskStatus::Ready, None, None).expect("transition");

    let pointer = handle
        .store
        .task_dir(&parent.id, TaskStatus::Backlog)
        .join("subtasks")
        .join(format!("{}.md", child.id));
    assert!(pointer.exists());
}
