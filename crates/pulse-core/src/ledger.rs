// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic append-only JSONL ledger writer, shared by the daemon manager's
//! restart log, the query service's audit log, and Codex's decision log
//! across daemons. Appends are serialized by a single lock per ledger
//! instance, matching the teacher's `job_logger` append idiom but propagating
//! I/O failures rather than swallowing them — these ledgers are the
//! authoritative operator-visible record.

use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one JSON line. Creates the parent directory if absent.
    pub fn append<T: Serialize>(&self, entry: &T) -> std::io::Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}
