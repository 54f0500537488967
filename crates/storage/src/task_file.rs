// SPDX-License-Identifier: MIT

//! Task card encoding: a YAML header fenced by `---` lines, then a Markdown
//! body. Implementations must round-trip unknown
//! fields, which [`aof_core::Task::extra`] takes care of.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use aof_core::Task;

use crate::StoreError;

const FENCE: &str = "---";

/// Render a task's header + body into the on-disk Markdown form.
pub fn encode(task: &Task) -> Result<String, StoreError> {
    let header = serde_yaml::to_string(task)?;
    let mut out = String::with_capacity(header.len() + task.body.len() + 16);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(FENCE);
    out.push('\n');
    if !task.body.is_empty() {
        out.push_str(&task.body);
        if !task.body.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse a task card's on-disk form back into a [`Task`].
pub fn decode(raw: &str) -> Result<Task, StoreError> {
    let rest = raw.strip_prefix(FENCE).ok_or_else(|| {
        StoreError::Corruption("task file missing opening `---` header fence".into())
    })?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let end = rest.find("\n---").ok_or_else(|| {
        StoreError::Corruption("task file missing closing `---` header fence".into())
    })?;
    let header_yaml = &rest[..end];
    let after_fence = &rest[end + 4..];
    let body = after_fence.strip_prefix('\n').unwrap_or(after_fence);

    let mut task: Task = serde_yaml::from_str(header_yaml)
        .map_err(|e| StoreError::Corruption(format!("invalid task header: {e}")))?;
    task.body = body.to_string();
    Ok(task)
}

/// Write `contents` to `path` atomically: write to a sibling temp file in
/// the same directory, `fsync`, then `rename(2)` over the final path. A
/// crash mid-write leaves the original file untouched. Used for task cards
/// as well as the JSON run-artifact files written into a task's working
/// directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let dir = path.parent().ok_or_else(|| {
        StoreError::Corruption(format!("path {} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("tmp");
    let tmp_name = format!(".tmp-{}.{extension}", nanoid::nanoid!(8));
    let tmp_path = dir.join(tmp_name);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "task_file_tests.rs"]
mod tests;
