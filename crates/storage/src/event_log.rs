// SPDX-License-Identifier: MIT

//! Append-only JSONL event log, daily-rotated per project.
//!
//! Never the source of truth for task state — a replayable witness only.
//! Logging failures are reported but must never block the caller that
//! produced the state change.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use aof_core::{Clock, Event};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bounded query over the event log.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub event_type: Option<String>,
    pub task_id: Option<String>,
    pub actor: Option<String>,
    pub from_ts: Option<DateTime<Utc>>,
    pub to_ts: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl EventQuery {
    fn matches(&self, event: &Event) -> bool {
        if let Some(t) = &self.event_type {
            if &event.event_type != t {
                return false;
            }
        }
        if let Some(id) = &self.task_id {
            if event.task_id.as_ref().map(|t| t.as_str()) != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &event.actor != actor {
                return false;
            }
        }
        if let Some(from) = self.from_ts {
            if event.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_ts {
            if event.timestamp > to {
                return false;
            }
        }
        true
    }
}

/// Append-only event log for one project, rotated into one JSONL file per
/// UTC day. `eventId` is monotonic per (project, day) only — never globally
/// unique.
pub struct EventLog {
    root: PathBuf,
    state: Mutex<RotationState>,
}

struct RotationState {
    day: NaiveDate,
    next_id: u64,
    file: File,
}

impl EventLog {
    /// Open (creating if absent) the event log rooted at `events_dir`.
    pub fn open(events_dir: impl Into<PathBuf>, clock: &impl Clock) -> Result<Self, EventLogError> {
        let root = events_dir.into();
        fs::create_dir_all(&root)?;
        let day = clock.now().date_naive();
        let (file, next_id) = Self::open_day(&root, day)?;
        Ok(Self { root, state: Mutex::new(RotationState { day, next_id, file }) })
    }

    fn path_for_day(root: &Path, day: NaiveDate) -> PathBuf {
        root.join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    /// Open the file for `day`, scanning it to recover the next event id.
    fn open_day(root: &Path, day: NaiveDate) -> Result<(File, u64), EventLogError> {
        let path = Self::path_for_day(root, day);
        let file = OpenOptions::new().create(true).append(true).read(true).open(&path)?;
        let mut max_id = 0u64;
        let reader = BufReader::new(file.try_clone()?);
        for (lineno, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(err) => {
                    warn!(path = %path.display(), lineno, %err, "malformed event log line, skipping");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(&line) {
                Ok(event) => max_id = max_id.max(event.event_id),
                Err(err) => {
                    warn!(path = %path.display(), lineno, %err, "malformed event log line, skipping");
                }
            }
        }
        Ok((file, max_id + 1))
    }

    /// Append an event, assigning it the next monotonic id for today. Never
    /// panics or returns an error that should abort the caller's mutation —
    /// callers are expected to log-and-continue on failure, per §4.1.
    pub fn append(&self, mut event: Event, clock: &impl Clock) -> Result<Event, EventLogError> {
        let mut state = self.state.lock();
        let today = clock.now().date_naive();
        if today != state.day {
            let (file, next_id) = Self::open_day(&self.root, today)?;
            state.day = today;
            state.next_id = next_id;
            state.file = file;
        }
        event.event_id = state.next_id;
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        state.file.write_all(&line)?;
        state.file.sync_data()?;
        state.next_id += 1;
        Ok(event)
    }

    /// Scan the relevant day files for matching events, newest-day-first.
    pub fn query(&self, query: &EventQuery) -> Result<Vec<Event>, EventLogError> {
        let mut files = self.day_files_in_range(query.from_ts, query.to_ts)?;
        files.sort();
        files.reverse();

        let mut out = Vec::new();
        let limit = query.limit.unwrap_or(usize::MAX);
        'files: for path in files {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let reader = BufReader::new(file);
            let mut lines: Vec<String> = Vec::new();
            for line in reader.lines() {
                match line {
                    Ok(l) if !l.trim().is_empty() => lines.push(l),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(path = %path.display(), %err, "malformed event log line, skipping");
                    }
                }
            }
            for line in lines.into_iter().rev() {
                let event: Event = match serde_json::from_str(&line) {
                    Ok(e) => e,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "malformed event log line, skipping");
                        continue;
                    }
                };
                if query.matches(&event) {
                    out.push(event);
                    if out.len() >= limit {
                        break 'files;
                    }
                }
            }
        }
        out.reverse();
        Ok(out)
    }

    fn day_files_in_range(
        &self,
        from_ts: Option<DateTime<Utc>>,
        to_ts: Option<DateTime<Utc>>,
    ) -> Result<Vec<PathBuf>, EventLogError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let Ok(day) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") else { continue };
            if let Some(from) = from_ts {
                if day < from.date_naive() {
                    continue;
                }
            }
            if let Some(to) = to_ts {
                if day > to.date_naive() {
                    continue;
                }
            }
            out.push(path);
        }
        Ok(out)
    }

    /// Timestamp of the most recently appended event across all days, or
    /// `None` if the log is empty.
    pub fn last_event_at(&self) -> Result<Option<DateTime<Utc>>, EventLogError> {
        let mut files = self.day_files_in_range(None, None)?;
        files.sort();
        while let Some(path) = files.pop() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let mut last = None;
            for line in reader.lines() {
                let Ok(line) = line else { continue };
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(event) = serde_json::from_str::<Event>(&line) {
                    last = Some(event.timestamp);
                }
            }
            if last.is_some() {
                return Ok(last);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
