// SPDX-License-Identifier: MIT

use super::*;
use tempfile::tempdir;

fn write_manifest(dir: &Path, id: &str, status: &str) {
    let project_dir = dir.join("projects").join(id);
    fs::create_dir_all(&project_dir).expect("mkdir");
    let yaml = format!(
        "id: {id}\ntitle: {id} project\ntype: engineering\nstatus: {status}\n"
    );
    fs::write(project_dir.join("project.yaml"), yaml).expect("write manifest");
}

#[test]
fn list_always_includes_synthesized_inbox() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::open(dir.path()).expect("open");
    let records = registry.list(false).expect("list");
    assert!(records.iter().any(|r| r.id.is_inbox()));
}

#[test]
fn list_excludes_archived_by_default() {
    let dir = tempdir().expect("tempdir");
    write_manifest(dir.path(), "active-project", "active");
    write_manifest(dir.path(), "old-project", "archived");
    let registry = Registry::open(dir.path()).expect("open");

    let visible = registry.list(false).expect("list");
    assert!(visible.iter().any(|r| r.id.as_str() == "active-project"));
    assert!(!visible.iter().any(|r| r.id.as_str() == "old-project"));

    let all = registry.list(true).expect("list all");
    assert!(all.iter().any(|r| r.id.as_str() == "old-project"));
}

#[test]
fn malformed_manifest_does_not_block_discovery_of_others() {
    let dir = tempdir().expect("tempdir");
    write_manifest(dir.path(), "good-project", "active");
    let bad_dir = dir.path().join("projects").join("bad-project");
    fs::create_dir_all(&bad_dir).expect("mkdir");
    fs::write(bad_dir.join("project.yaml"), "not: [valid, yaml for this schema").expect("write");

    let registry = Registry::open(dir.path()).expect("open");
    let records = registry.list(true).expect("list");

    let good = records.iter().find(|r| r.id.as_str() == "good-project").expect("good present");
    assert!(good.manifest.is_ok());

    let bad = records.iter().find(|r| r.id.as_str() == "bad-project").expect("bad present");
    assert!(bad.manifest.is_err());
}

#[test]
fn get_resolves_inbox_even_when_absent() {
    let dir = tempdir().expect("tempdir");
    let registry = Registry::open(dir.path()).expect("open");
    let record = registry.get(&aof_core::ProjectId::inbox()).expect("get").expect("present");
    assert!(record.manifest.is_ok());
}
