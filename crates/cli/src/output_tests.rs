// SPDX-License-Identifier: MIT

use serde::Serialize;

use super::{format_or_json, handle_list, OutputFormat};

#[derive(Serialize)]
struct Row {
    name: String,
}

#[test]
fn handle_list_prints_empty_message_for_text() {
    let rows: Vec<Row> = vec![];
    let result = handle_list(OutputFormat::Text, &rows, "nothing here", |_| panic!("unreachable"));
    assert!(result.is_ok());
}

#[test]
fn handle_list_renders_text_for_nonempty() {
    let rows = vec![Row { name: "a".into() }];
    let mut rendered = false;
    let result = handle_list(OutputFormat::Text, &rows, "nothing here", |items| {
        rendered = items.len() == 1;
    });
    assert!(result.is_ok());
    assert!(rendered);
}

#[test]
fn handle_list_json_does_not_invoke_text_renderer() {
    let rows = vec![Row { name: "a".into() }];
    let result = handle_list(OutputFormat::Json, &rows, "nothing here", |_| panic!("unreachable"));
    assert!(result.is_ok());
}

#[test]
fn format_or_json_dispatches_on_format() {
    let mut called = false;
    format_or_json(OutputFormat::Text, &Row { name: "x".into() }, || called = true).unwrap();
    assert!(called);
}
