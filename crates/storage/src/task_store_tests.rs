// SPDX-License-Identifier: MIT

use super::*;
use aof_core::FakeClock;
use std::sync::Arc;
use tempfile::tempdir;

fn open_store(dir: &Path) -> FilesystemTaskStore<FakeClock> {
    let clock = FakeClock::new();
    let event_log = Arc::new(EventLog::open(dir.join("events"), &clock).expect("open event log"));
    FilesystemTaskStore::open(dir, "demo", clock, event_log).expect("open store")
}

use std::path::Path;

#[test]
fn create_writes_a_card_in_backlog() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store
        .create(CreateTaskInput { title: "do the thing".into(), created_by: "tester".into(), ..Default::default() })
        .expect("create");
    assert_eq!(task.status, TaskStatus::Backlog);
    assert!(store.card_path(TaskStatus::Backlog, &task.id).exists());
}

#[test]
fn create_rejects_missing_dependency() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let bogus = TaskId::from_string("20260101T000000Z-bogus1");
    let err = store
        .create(CreateTaskInput {
            title: "needs a blocker".into(),
            created_by: "tester".into(),
            depends_on: vec![bogus],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingDependency(id) if id == bogus));
}

#[test]
fn transition_moves_the_card_between_directories() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store
        .create(CreateTaskInput { title: "move me".into(), created_by: "tester".into(), ..Default::default() })
        .expect("create");

    let moved = store.transition(&task.id, TaskStatus::Ready, None, None).expect("transition");
    assert_eq!(moved.status, TaskStatus::Ready);
    assert!(!store.card_path(TaskStatus::Backlog, &task.id).exists());
    assert!(store.card_path(TaskStatus::Ready, &task.id).exists());
}

#[test]
fn transition_rejects_illegal_edge() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store
        .create(CreateTaskInput { title: "stays in backlog".into(), created_by: "tester".into(), ..Default::default() })
        .expect("create");

    let err = store.transition(&task.id, TaskStatus::Done, None, None).unwrap_err();
    assert!(matches!(err, StoreError::IllegalTransition(TaskStatus::Backlog, TaskStatus::Done)));
}

#[test]
fn transition_rejects_from_terminal_state() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store
        .create(CreateTaskInput { title: "will be cancelled".into(), created_by: "tester".into(), ..Default::default() })
        .expect("create");
    store.cancel(&task.id, Some("no longer needed")).expect("cancel");

    let err = store.transition(&task.id, TaskStatus::Ready, None, None).unwrap_err();
    assert!(matches!(err, StoreError::Terminal(id) if id == task.id));
}

#[test]
fn add_dep_rejects_direct_cycle() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let a = store.create(CreateTaskInput { title: "a".into(), created_by: "t".into(), ..Default::default() }).expect("create a");
    let b = store.create(CreateTaskInput { title: "b".into(), created_by: "t".into(), ..Default::default() }).expect("create b");

    store.add_dep(&a.id, &b.id).expect("a depends on b");
    let err = store.add_dep(&b.id, &a.id).unwrap_err();
    assert!(matches!(err, StoreError::DependencyCycle(_, _)));
}

#[test]
fn add_dep_rejects_transitive_cycle() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let a = store.create(CreateTaskInput { title: "a".into(), created_by: "t".into(), ..Default::default() }).expect("create a");
    let b = store.create(CreateTaskInput { title: "b".into(), created_by: "t".into(), ..Default::default() }).expect("create b");
    let c = store.create(CreateTaskInput { title: "c".into(), created_by: "t".into(), ..Default::default() }).expect("create c");

    store.add_dep(&a.id, &b.id).expect("a depends on b");
    store.add_dep(&b.id, &c.id).expect("b depends on c");
    let err = store.add_dep(&c.id, &a.id).unwrap_err();
    assert!(matches!(err, StoreError::DependencyCycle(_, _)));
}

#[test]
fn count_by_status_reflects_creates_and_transitions() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "counted".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("transition");

    let counts = store.count_by_status().expect("count");
    assert_eq!(counts[&TaskStatus::Backlog], 0);
    assert_eq!(counts[&TaskStatus::Ready], 1);
}

#[test]
fn get_by_prefix_finds_a_unique_match() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "findable".into(), created_by: "t".into(), ..Default::default() }).expect("create");

    let prefix = &task.id.as_str()[..12];
    let found = store.get_by_prefix(prefix).expect("lookup").expect("present");
    assert_eq!(found.id, task.id);
}

#[test]
fn delete_removes_card_and_working_dir() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "ephemeral".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.write_task_output(&task.id, "notes.txt", b"hi").expect("write output");

    assert!(store.delete(&task.id).expect("delete"));
    assert!(!store.card_path(TaskStatus::Backlog, &task.id).exists());
    assert!(!store.working_dir(TaskStatus::Backlog, &task.id).exists());
    assert!(!store.delete(&task.id).expect("second delete"));
}

#[test]
fn acquire_lease_transitions_ready_to_in_progress() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "lease me".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");

    let agent = aof_core::AgentId::new();
    let leased = store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(60)).expect("acquire");
    assert_eq!(leased.status, TaskStatus::InProgress);
    let lease = leased.lease.expect("lease present");
    assert_eq!(lease.agent, agent);
    assert_eq!(lease.renew_count, 0);
}

#[test]
fn acquire_lease_writes_run_info() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "lease me".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");

    let agent = aof_core::AgentId::new();
    store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(60)).expect("acquire");

    let run_json = store.working_dir(TaskStatus::InProgress, &task.id).join("run.json");
    let raw = std::fs::read_to_string(&run_json).expect("run.json exists");
    let info: aof_core::RunInfo = serde_json::from_str(&raw).expect("valid run.json");
    assert_eq!(info.task_id, task.id);
    assert_eq!(info.agent_id, agent);
    assert_eq!(info.status, aof_core::RunStatus::Running);
}

#[test]
fn completing_a_task_marks_run_info_completed() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "finish me".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    let agent = aof_core::AgentId::new();
    store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(60)).expect("acquire");

    store.transition(&task.id, TaskStatus::Done, None, None).expect("done");

    let run_json = store.working_dir(TaskStatus::Done, &task.id).join("run.json");
    let raw = std::fs::read_to_string(&run_json).expect("run.json exists");
    let info: aof_core::RunInfo = serde_json::from_str(&raw).expect("valid run.json");
    assert_eq!(info.status, aof_core::RunStatus::Completed);
}

#[test]
fn renew_lease_extends_expiry_and_bumps_count() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "renewable".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    let agent = aof_core::AgentId::new();
    let leased = store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(60)).expect("acquire");
    let first_expiry = leased.lease.expect("lease").expires_at;

    let renewed = store.renew_lease(&task.id, std::time::Duration::from_secs(120)).expect("renew");
    let lease = renewed.lease.expect("lease present");
    assert_eq!(lease.renew_count, 1);
    assert!(lease.expires_at > first_expiry);
}

#[test]
fn release_lease_clears_lease_without_changing_status() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "releasable".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    let agent = aof_core::AgentId::new();
    store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(60)).expect("acquire");

    let released = store.release_lease(&task.id).expect("release");
    assert_eq!(released.status, TaskStatus::InProgress);
    assert!(released.lease.is_none());
}

#[test]
fn expired_leases_finds_only_tasks_past_expiry() {
    let dir = tempdir().expect("tempdir");
    let clock = FakeClock::new();
    let event_log = Arc::new(EventLog::open(dir.path().join("events"), &clock).expect("open event log"));
    let store = FilesystemTaskStore::open(dir.path(), "demo", clock.clone(), event_log).expect("open store");
    let task = store.create(CreateTaskInput { title: "expiring".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    let agent = aof_core::AgentId::new();
    store.acquire_lease(&task.id, &agent, std::time::Duration::from_secs(1)).expect("acquire");

    assert!(store.expired_leases(clock.now()).expect("expired").is_empty());

    clock.advance(std::time::Duration::from_secs(2));
    let expired = store.expired_leases(clock.now()).expect("expired");
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, task.id);
}

#[test]
fn merge_metadata_adds_keys_without_touching_status() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let task = store.create(CreateTaskInput { title: "tagged".into(), created_by: "t".into(), ..Default::default() }).expect("create");

    let mut updates = HashMap::new();
    updates.insert("correlationId".to_string(), serde_json::json!("corr-1"));
    let updated = store.merge_metadata(&task.id, updates).expect("merge");
    assert_eq!(updated.status, TaskStatus::Backlog);
    assert_eq!(updated.metadata_str("correlationId"), Some("corr-1"));
}

#[test]
fn transition_hook_fires_with_from_and_to() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let seen: Arc<Mutex<Vec<(TaskStatus, TaskStatus)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    store.register_transition_hook(Box::new(move |_task, from, to| {
        seen_clone.lock().push((from, to));
    }));

    let task = store.create(CreateTaskInput { title: "hooked".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("transition");

    assert_eq!(seen.lock().as_slice(), &[(TaskStatus::Backlog, TaskStatus::Ready)]);
}
