// SPDX-License-Identifier: MIT

use super::*;
use aof_core::ProjectId;

fn sample() -> Envelope {
    Envelope {
        protocol: "aof".into(),
        version: 1,
        project_id: ProjectId::new("demo").expect("project id"),
        message_type: MessageType::StatusUpdate,
        task_id: TaskId::from_string("20260101T000000Z-abcdef1"),
        from_agent: AgentId::new(),
        to_agent: None,
        sent_at: Utc::now(),
        payload: serde_json::json!({}),
    }
}

#[test]
fn well_formed_requires_aof_protocol_and_version_one() {
    assert!(sample().is_well_formed());

    let mut bad_protocol = sample();
    bad_protocol.protocol = "other".into();
    assert!(!bad_protocol.is_well_formed());

    let mut bad_version = sample();
    bad_version.version = 2;
    assert!(!bad_version.is_well_formed());
}

#[test]
fn message_type_round_trips_through_dotted_names() {
    for (variant, name) in [
        (MessageType::StatusUpdate, "status.update"),
        (MessageType::CompletionReport, "completion.report"),
        (MessageType::HandoffRequest, "handoff.request"),
        (MessageType::HandoffAccepted, "handoff.accepted"),
        (MessageType::HandoffRejected, "handoff.rejected"),
    ] {
        let json = serde_json::to_value(variant).expect("serialize");
        assert_eq!(json, serde_json::json!(name));
        let back: MessageType = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, variant);
    }
}

#[test]
fn envelope_round_trips_camel_case_fields() {
    let envelope = sample();
    let json = serde_json::to_string(&envelope).expect("serialize");
    assert!(json.contains("\"projectId\""));
    assert!(json.contains("\"taskId\""));
    assert!(json.contains("\"fromAgent\""));
    assert!(json.contains("\"sentAt\""));
    let back: Envelope = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.task_id, envelope.task_id);
}
