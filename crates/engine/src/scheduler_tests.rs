// SPDX-License-Identifier: MIT

use super::*;
use aof_adapters::MockAdapter;
use aof_core::{AgentId, FakeClock, Heartbeat, Priority, Routing, TeamId};
use aof_storage::{CreateTaskInput, EventLog, FilesystemTaskStore};
use tempfile::tempdir;

fn harness(dir: &std::path::Path) -> (Scheduler<FakeClock>, Arc<dyn TaskStore>, MockAdapter, FakeClock) {
    let clock = FakeClock::new();
    let event_log = Arc::new(EventLog::open(dir.join("events"), &clock).expect("open event log"));
    let store: Arc<dyn TaskStore> =
        Arc::new(FilesystemTaskStore::open(dir, "demo", clock.clone(), event_log.clone()).expect("open store"));
    let executor = MockAdapter::new();
    let scheduler = Scheduler::new(
        store.clone(),
        Arc::new(executor.clone()),
        event_log,
        clock.clone(),
        ProjectId::new("demo").expect("project id"),
        dir.to_string_lossy().into_owned(),
        SchedulerConfig { max_retries: 2, ..Default::default() },
    );
    (scheduler, store, executor, clock)
}

fn ready_task_with_agent(store: &Arc<dyn TaskStore>) -> TaskId {
    let task = store
        .create(CreateTaskInput {
            title: "assignable".into(),
            created_by: "tester".into(),
            routing: Some(Routing { agent: Some(AgentId::new()), ..Default::default() }),
            priority: Some(Priority::High),
            ..Default::default()
        })
        .expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    task.id
}

#[tokio::test]
async fn plan_produces_an_assign_for_a_ready_unleased_task() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, _executor, _clock) = harness(dir.path());
    let id = ready_task_with_agent(&store);

    let actions = scheduler.plan().expect("plan");
    assert!(actions.iter().any(|a| matches!(a, Action::Assign(t) if *t == id)));
}

#[tokio::test]
async fn poll_dispatches_and_records_session_id() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, executor, _clock) = harness(dir.path());
    let id = ready_task_with_agent(&store);

    let count = scheduler.poll().await.expect("poll");
    assert_eq!(count, 1);

    let task = store.get(&id).expect("get").expect("present");
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.metadata_str("sessionId").expect("session id").starts_with("mock-session-"));
    assert_eq!(executor.spawns().len(), 1);
}

#[tokio::test]
async fn dependency_satisfied_promotes_backlog_to_ready() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, _executor, _clock) = harness(dir.path());
    let blocker = store.create(CreateTaskInput { title: "blocker".into(), created_by: "t".into(), ..Default::default() }).expect("create");
    let dependent = store
        .create(CreateTaskInput {
            title: "dependent".into(),
            created_by: "t".into(),
            depends_on: vec![blocker.id],
            ..Default::default()
        })
        .expect("create");
    store.transition(&blocker.id, TaskStatus::Ready, None, None).expect("ready");
    let agent = AgentId::new();
    store.acquire_lease(&blocker.id, &agent, std::time::Duration::from_secs(60)).expect("lease");
    store.transition(&blocker.id, TaskStatus::Done, None, None).expect("done");

    let actions = scheduler.plan().expect("plan");
    assert!(actions.iter().any(|a| matches!(a, Action::DependencySatisfied(t) if *t == dependent.id)));

    scheduler.execute(Action::DependencySatisfied(dependent.id)).await.expect("execute");
    assert_eq!(store.get(&dependent.id).expect("get").expect("present").status, TaskStatus::Ready);
}

#[tokio::test]
async fn stale_heartbeat_force_completes_and_reclaims_to_ready() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, executor, clock) = harness(dir.path());
    let id = ready_task_with_agent(&store);
    scheduler.poll().await.expect("initial poll dispatches");

    let task = store.get(&id).expect("get").expect("present");
    assert_eq!(task.status, TaskStatus::InProgress);
    let heartbeat = Heartbeat {
        task_id: id,
        agent_id: AgentId::new(),
        last_heartbeat: clock.now(),
        beat_count: 1,
        expires_at: clock.now() - chrono::Duration::milliseconds(1),
    };
    let working_dir = store.task_dir(&id, TaskStatus::InProgress);
    std::fs::create_dir_all(&working_dir).expect("mkdir working dir");
    std::fs::write(
        working_dir.join("run_heartbeat.json"),
        serde_json::to_vec(&heartbeat).expect("serialize"),
    )
    .expect("write heartbeat");

    scheduler.execute(Action::StaleHeartbeat(id)).await.expect("execute");

    let reclaimed = store.get(&id).expect("get").expect("present");
    assert_eq!(reclaimed.status, TaskStatus::Ready);
    assert!(reclaimed.lease.is_none());
    assert_eq!(executor.force_completes().len(), 1);
    assert_eq!(executor.force_completes()[0].reason, "stale_heartbeat");
}

#[tokio::test]
async fn task_without_an_sla_never_breaches() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, _executor, clock) = harness(dir.path());
    let task = store
        .create(CreateTaskInput { title: "slammed".into(), created_by: "t".into(), ..Default::default() })
        .expect("create");
    clock.advance(std::time::Duration::from_secs(3600));

    let actions = scheduler.plan().expect("plan");
    assert!(!actions.iter().any(|a| matches!(a, Action::SlaBreach(t) if *t == task.id)));
}

#[tokio::test]
async fn sla_breach_deadlettering_a_ready_task_does_not_abort_the_poll() {
    use aof_core::{Sla, SlaViolationAction};
    use aof_storage::task_file;

    let dir = tempdir().expect("tempdir");
    let (scheduler, store, _executor, clock) = harness(dir.path());
    let task = store
        .create(CreateTaskInput { title: "languishing".into(), created_by: "t".into(), ..Default::default() })
        .expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");

    let mut with_sla = store.get(&task.id).expect("get").expect("present");
    with_sla.sla = Some(Sla { target_ms: 1_000, on_violation: SlaViolationAction::Deadletter });
    let card_path = dir.path().join("tasks").join(TaskStatus::Ready.dir_name()).join(format!("{}.md", task.id));
    let raw = task_file::encode(&with_sla).expect("encode");
    task_file::write_atomic(&card_path, &raw).expect("write");

    clock.advance(std::time::Duration::from_secs(3600));

    let count = scheduler.poll().await.expect("poll must not abort on an SLA breach outside in-progress");
    assert_eq!(count, 1);

    let after = store.get(&task.id).expect("get").expect("present");
    assert_eq!(after.status, TaskStatus::Deadletter);
}

#[tokio::test]
async fn throttled_team_is_excluded_from_assign_candidates() {
    let dir = tempdir().expect("tempdir");
    let (scheduler, store, _executor, clock) = harness(dir.path());
    let team = TeamId::new();
    let task = store
        .create(CreateTaskInput {
            title: "throttled".into(),
            created_by: "t".into(),
            routing: Some(Routing { agent: Some(AgentId::new()), team: Some(team), ..Default::default() }),
            ..Default::default()
        })
        .expect("create");
    store.transition(&task.id, TaskStatus::Ready, None, None).expect("ready");
    throttle::reset();
    throttle::record(&team, clock.now());

    let actions = scheduler.plan().expect("plan");
    assert!(!actions.iter().any(|a| matches!(a, Action::Assign(t) if *t == task.id)));
    throttle::reset();
}
