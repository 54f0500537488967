// SPDX-License-Identifier: MIT

use tempfile::tempdir;
use yare::parameterized;

use super::*;
use crate::output::OutputFormat;

#[parameterized(
    backlog = {"backlog", TaskStatus::Backlog},
    in_progress = {"in-progress", TaskStatus::InProgress},
    deadletter = {"deadletter", TaskStatus::Deadletter},
)]
fn parse_status_accepts_every_dir_name(raw: &str, expected: TaskStatus) {
    assert_eq!(parse_status(raw).unwrap(), expected);
}

#[test]
fn parse_status_rejects_unknown() {
    assert!(parse_status("nonexistent").is_err());
}

#[parameterized(
    low = {"low", Priority::Low},
    critical = {"critical", Priority::Critical},
)]
fn parse_priority_accepts_known_values(raw: &str, expected: Priority) {
    assert_eq!(parse_priority(raw).unwrap(), expected);
}

#[test]
fn parse_priority_rejects_unknown() {
    assert!(parse_priority("urgent").is_err());
}

#[test]
fn create_then_list_then_show_then_transition_round_trips() {
    let dir = tempdir().unwrap();

    run(
        TaskArgs {
            command: TaskCommand::Create {
                title: "ship it".into(),
                project: "_inbox".into(),
                body: None,
                priority: Some("high".into()),
                agent: None,
                parent: None,
                depends_on: vec![],
                created_by: "test".into(),
            },
        },
        dir.path(),
        OutputFormat::Text,
    )
    .unwrap();

    let store = crate::store::open_store(dir.path(), "_inbox").unwrap();
    let tasks = store.list(&ListFilter::default()).unwrap();
    assert_eq!(tasks.len(), 1);
    let id = tasks[0].id.to_string();

    run(
        TaskArgs {
            command: TaskCommand::Show { id: id.clone(), project: "_inbox".into() },
        },
        dir.path(),
        OutputFormat::Json,
    )
    .unwrap();

    run(
        TaskArgs {
            command: TaskCommand::Transition {
                id,
                to: "ready".into(),
                project: "_inbox".into(),
                reason: None,
                agent: None,
            },
        },
        dir.path(),
        OutputFormat::Text,
    )
    .unwrap();

    let tasks = store.list(&ListFilter::default()).unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Ready);
}
