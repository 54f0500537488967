// SPDX-License-Identifier: MIT

use super::*;
use aof_core::{Task, TaskStatus};
use tempfile::tempdir;

fn sample_task() -> Task {
    let mut task = Task::builder().title("write the docs").build();
    task.body = "Some context about the task.\n".to_string();
    task.status = TaskStatus::Ready;
    task
}

#[test]
fn encode_then_decode_round_trips() {
    let task = sample_task();
    let raw = encode(&task).expect("encode");
    assert!(raw.starts_with("---\n"));
    let decoded = decode(&raw).expect("decode");
    assert_eq!(decoded.id, task.id);
    assert_eq!(decoded.title, task.title);
    assert_eq!(decoded.status, task.status);
    assert_eq!(decoded.body, task.body);
}

#[test]
fn decode_preserves_unknown_header_fields() {
    let raw = "---\nid: 20260101T000000Z-abcdef\nproject: _inbox\ntitle: demo\nstatus: backlog\ncreatedAt: 2026-01-01T00:00:00Z\nupdatedAt: 2026-01-01T00:00:00Z\nlastTransitionAt: 2026-01-01T00:00:00Z\ncreatedBy: tester\nfutureField: keep-me\n---\nbody text\n";
    let task = decode(raw).expect("decode");
    assert_eq!(task.extra.get("futureField").and_then(|v| v.as_str()), Some("keep-me"));

    let re_encoded = encode(&task).expect("encode");
    assert!(re_encoded.contains("futureField"));
}

#[test]
fn decode_rejects_missing_fence() {
    let err = decode("no header here").unwrap_err();
    assert!(matches!(err, StoreError::Corruption(_)));
}

#[test]
fn write_atomic_leaves_no_temp_file_behind() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("task.md");
    write_atomic(&path, "hello").expect("write");
    assert_eq!(fs::read_to_string(&path).expect("read"), "hello");

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("read_dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}
