// SPDX-License-Identifier: MIT

use super::*;
use crate::clock::FakeClock;

#[test]
fn task_id_sorts_chronologically() {
    let clock = FakeClock::new();
    let a = TaskId::generate(&clock);
    clock.advance(std::time::Duration::from_secs(1));
    let b = TaskId::generate(&clock);
    assert!(a < b, "{a} should sort before {b}");
}

#[test]
fn priority_orders_critical_above_low() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
}

#[test]
fn status_dir_name_round_trips() {
    for status in TaskStatus::all() {
        let name = status.dir_name();
        assert_eq!(TaskStatus::from_dir_name(name), Some(status));
    }
}

#[test]
fn terminal_statuses_reject_all_transitions() {
    for terminal in [TaskStatus::Done, TaskStatus::Cancelled, TaskStatus::Deadletter] {
        for target in TaskStatus::all() {
            assert!(!TaskStatus::can_transition(terminal, target));
        }
    }
}

#[test]
fn happy_path_edges_are_legal() {
    use TaskStatus::*;
    assert!(TaskStatus::can_transition(Backlog, Ready));
    assert!(TaskStatus::can_transition(Ready, InProgress));
    assert!(TaskStatus::can_transition(InProgress, Review));
    assert!(TaskStatus::can_transition(Review, Done));
    assert!(TaskStatus::can_transition(InProgress, Done));
    assert!(TaskStatus::can_transition(Blocked, Ready));
    assert!(TaskStatus::can_transition(InProgress, Deadletter));
}

#[test]
fn any_non_terminal_can_cancel_or_block() {
    use TaskStatus::*;
    for from in [Backlog, Ready, InProgress, Blocked, Review] {
        assert!(TaskStatus::can_transition(from, Cancelled));
        assert!(TaskStatus::can_transition(from, Blocked) || from == Blocked);
    }
}

#[test]
fn illegal_edge_is_rejected() {
    use TaskStatus::*;
    assert!(!TaskStatus::can_transition(Backlog, Done));
    assert!(!TaskStatus::can_transition(Ready, Review));
}

#[test]
fn lease_active_iff_not_expired() {
    let now = Utc::now();
    let lease = Lease {
        agent: AgentId::new(),
        acquired_at: now,
        expires_at: now + chrono::Duration::seconds(30),
        renew_count: 0,
    };
    assert!(lease.is_active(now));
    assert!(!lease.is_active(now + chrono::Duration::seconds(31)));
}

#[test]
fn task_builder_produces_sane_default() {
    let task = Task::builder().title("do the thing").build();
    assert_eq!(task.title, "do the thing");
    assert_eq!(task.status, TaskStatus::Backlog);
    assert!(!task.is_terminal());
}
