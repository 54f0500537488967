// SPDX-License-Identifier: MIT

use super::*;
use aof_core::ProjectId;

fn ctx(task_id: &str) -> TaskContext {
    TaskContext {
        task_id: TaskId::from_string(task_id),
        task_path: format!("ready/{task_id}.md"),
        agent: None,
        priority: Priority::Normal,
        routing: Routing::default(),
        project_id: ProjectId::inbox(),
        project_root: "/tmp/aof/_inbox".to_string(),
        task_relpath: format!("ready/{task_id}.md"),
        gate_context: None,
    }
}

fn opts() -> SpawnOptions {
    SpawnOptions { timeout: Duration::from_secs(30), correlation_id: "corr-1".to_string() }
}

#[tokio::test]
async fn mock_adapter_auto_completes_by_default() {
    let adapter = MockAdapter::new();
    let result = adapter.spawn(ctx("t1"), opts()).await.expect("spawn");
    assert!(result.success);
    assert!(result.session_id.expect("session id").starts_with("mock-session-"));
}

#[tokio::test]
async fn mock_adapter_returns_scripted_failure() {
    let adapter = MockAdapter::new();
    adapter.fail_next(TaskId::from_string("t2"), "429 rate limit exceeded");
    let result = adapter.spawn(ctx("t2"), opts()).await.expect("spawn");
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("429 rate limit exceeded"));
    assert!(result.platform_limit.is_none());
}

#[tokio::test]
async fn mock_adapter_returns_scripted_platform_limit() {
    let adapter = MockAdapter::new();
    adapter.platform_limit_next(TaskId::from_string("t3"), 2, "concurrency ceiling lowered");
    let result = adapter.spawn(ctx("t3"), opts()).await.expect("spawn");
    assert!(!result.success);
    assert_eq!(result.platform_limit, Some(2));
}

#[tokio::test]
async fn mock_adapter_records_spawn_and_force_complete_calls() {
    let adapter = MockAdapter::new();
    adapter.spawn(ctx("t4"), opts()).await.expect("spawn");
    adapter.force_complete("mock-session-1", "stale_heartbeat").await.expect("force complete");

    let spawns = adapter.spawns();
    assert_eq!(spawns.len(), 1);
    assert_eq!(spawns[0].correlation_id, "corr-1");

    let force_completes = adapter.force_completes();
    assert_eq!(force_completes.len(), 1);
    assert_eq!(force_completes[0].reason, "stale_heartbeat");
}

#[tokio::test]
async fn noop_executor_fails_every_spawn() {
    let adapter = NoopExecutorAdapter;
    let result = adapter.spawn(ctx("t5"), opts()).await.expect("spawn");
    assert!(!result.success);
}

#[test]
fn classify_error_matches_taxonomy_table() {
    assert_eq!(classify_error("429 Too Many Requests", false), FailureClass::RateLimited);
    assert_eq!(classify_error("rate limit hit", false), FailureClass::RateLimited);
    assert_eq!(classify_error("anything", true), FailureClass::Timeout);
    assert_eq!(classify_error("connection reset by peer", false), FailureClass::TransientNetwork);
    assert_eq!(classify_error("502 bad gateway", false), FailureClass::TransientNetwork);
    assert_eq!(classify_error("no such agent: ghost", false), FailureClass::Permanent);
    assert_eq!(classify_error("404 not found", false), FailureClass::Permanent);
    assert_eq!(classify_error("segfault in subprocess", false), FailureClass::Unknown);
}

#[test]
fn unknown_failure_becomes_terminal_once_retries_exhausted() {
    assert!(!FailureClass::Unknown.is_terminal(2, 3));
    assert!(FailureClass::Unknown.is_terminal(3, 3));
    assert!(FailureClass::Permanent.is_terminal(0, 3));
    assert!(!FailureClass::RateLimited.is_terminal(99, 3));
}
