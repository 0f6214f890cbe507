// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, append-only record of every accepted event, partitioned by UTC
//! date. Grounded in the teacher's `job_logger` append idiom
//! (`OpenOptions::new().create(true).append(true)` + one `writeln!` per
//! line) but, unlike that auxiliary logger, propagates I/O failures: history
//! append sits on the critical path of publication and a failure here must
//! abort the publish before fan-out.

use crate::error::HistoryError;
use chrono::{DateTime, NaiveDate, Utc};
use pulse_core::PulseEvent;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub struct HistoryStore {
    root: PathBuf,
}

fn file_name_for_date(date: NaiveDate) -> String {
    format!("pulse_{}.jsonl", date.format("%Y-%m-%d"))
}

/// Parse the UTC date out of an event's normalized RFC3339 timestamp.
fn event_date(event: &PulseEvent) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(&event.timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one JSON line to `pulse_<date>.jsonl`, creating the root
    /// directory if absent. Atomic at the line level: a single `writeln!`
    /// call per event.
    pub fn append(&self, event: &PulseEvent) -> Result<(), HistoryError> {
        let date = event_date(event).unwrap_or_else(|| Utc::now().date_naive());
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(file_name_for_date(date));
        let line = serde_json::to_string(event).map_err(pulse_core::PulseError::from)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn history_files(&self, since: Option<DateTime<Utc>>) -> std::io::Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let cutoff_date = since.map(|dt| dt.date_naive());
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| name.starts_with("pulse_") && name.ends_with(".jsonl"))
                    .unwrap_or(false)
            })
            .filter(|path| match (cutoff_date, date_from_path(path)) {
                (Some(cutoff), Some(file_date)) => file_date >= cutoff,
                _ => true,
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Enumerate files whose date is ≥ `since.date()` (or all files if
    /// `since` is `None`), parsing every line, skipping malformed lines with
    /// a warning, filtering by `since`, and re-verifying the signature via
    /// `verify`. Order: ascending by filename, then by file (publish) order.
    /// Never mutates files.
    pub fn replay<F>(&self, since: Option<DateTime<Utc>>, verify: F) -> Result<Vec<PulseEvent>, HistoryError>
    where
        F: Fn(&PulseEvent) -> bool,
    {
        let mut out = Vec::new();
        for path in self.history_files(since)? {
            let file = match std::fs::File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable history file");
                    continue;
                }
            };
            let reader = std::io::BufReader::new(file);
            for (line_no, line) in reader.lines().enumerate() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), line = line_no, error = %e, "skipping unreadable history line");
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let value: serde_json::Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), line = line_no, error = %e, "skipping malformed history line");
                        continue;
                    }
                };
                let event = match PulseEvent::from_value(value) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), line = line_no, error = %e, "skipping invalid history event");
                        continue;
                    }
                };
                if let Some(cutoff) = since {
                    match DateTime::parse_from_rfc3339(&event.timestamp) {
                        Ok(ts) if ts.with_timezone(&Utc) < cutoff => continue,
                        Err(_) => continue,
                        _ => {}
                    }
                }
                if !verify(&event) {
                    tracing::warn!(path = %path.display(), line = line_no, "skipping event with invalid signature on replay");
                    continue;
                }
                out.push(event);
            }
        }
        Ok(out)
    }
}

fn date_from_path(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let trimmed = name.strip_prefix("pulse_")?.strip_suffix(".jsonl")?;
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
