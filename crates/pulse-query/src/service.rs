// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A narrow read-only surface over history and monitoring snapshots. Only
//! ever reads locally-originated, locally-signed records, so unlike the bus
//! this crate needs no peer registry — a plain verify key is enough.

use crate::error::QueryError;
use crate::filters::EventFilters;
use crate::window::parse_window;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use pulse_core::{is_unsafe_path, Ledger, MetricsSnapshot, PulseEvent, SignatureManager};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const MAX_EVENT_RESULTS: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsQueryResult {
    pub window: String,
    pub filters: EventFilters,
    pub summary: Value,
    pub anomalies: Vec<pulse_core::AnomalyBreach>,
    pub verified_snapshots: Vec<String>,
}

pub struct QueryService {
    history_root: PathBuf,
    metrics_path: PathBuf,
    verify_key: VerifyingKey,
    ledger: Ledger,
}

fn reject_unsafe(path: &Path) -> Result<(), QueryError> {
    if is_unsafe_path(path) {
        return Err(QueryError::PermissionDenied(format!(
            "path {} touches a restricted segment",
            path.display()
        )));
    }
    Ok(())
}

impl QueryService {
    pub fn new(
        history_root: impl Into<PathBuf>,
        metrics_path: impl Into<PathBuf>,
        ledger_path: impl Into<PathBuf>,
        verify_key: VerifyingKey,
    ) -> Self {
        Self {
            history_root: history_root.into(),
            metrics_path: metrics_path.into(),
            verify_key,
            ledger: Ledger::new(ledger_path.into()),
        }
    }

    fn audit(&self, requester: &str, query: &str, filters: &EventFilters, count: usize) {
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "requester": requester,
            "query": query,
            "filters": filters,
            "count": count,
        });
        if let Err(error) = self.ledger.append(&entry) {
            tracing::warn!(%error, "failed to append query audit entry");
        }
    }

    /// Stream history files from `since.date()` onward, keeping only
    /// locally-originated, signature-verified events matching `filters`,
    /// capped at [`MAX_EVENT_RESULTS`].
    pub fn query_events(
        &self,
        since: DateTime<Utc>,
        filters: &EventFilters,
        requester: &str,
    ) -> Result<Vec<PulseEvent>, QueryError> {
        reject_unsafe(&self.history_root)?;
        let store = pulse_history::HistoryStore::new(self.history_root.clone());
        let verify_key = self.verify_key;
        let mut events = store.replay(Some(since), move |event| {
            SignatureManager::verify_with_key(event, &verify_key)
        })?;
        events.retain(|e| e.source_peer == "local" && filters.matches(e));
        events.truncate(MAX_EVENT_RESULTS);
        self.audit(requester, "events", filters, events.len());
        Ok(events)
    }

    fn load_verified_snapshots(&self) -> Result<Vec<MetricsSnapshot>, QueryError> {
        reject_unsafe(&self.metrics_path)?;
        if !self.metrics_path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.metrics_path).map_err(pulse_core::PulseError::from)?;
        let mut out = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: MetricsSnapshot = match serde_json::from_str(line) {
                Ok(s) => s,
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed metrics line");
                    continue;
                }
            };
            if snapshot.verify(&self.verify_key) {
                out.push(snapshot);
            } else {
                tracing::warn!("skipping metrics snapshot with invalid signature");
            }
        }
        Ok(out)
    }

    /// Resolve `window_label` against the most recent verified snapshot
    /// that carries it, either by exact label match or by a duration
    /// expression matching a known `window_seconds`.
    pub fn query_metrics(
        &self,
        window_label: &str,
        filters: &EventFilters,
        requester: &str,
    ) -> Result<MetricsQueryResult, QueryError> {
        let snapshots = self.load_verified_snapshots()?;
        let verified_snapshots: Vec<String> = snapshots.iter().map(|s| s.timestamp.clone()).collect();

        let target_seconds = parse_window(window_label).ok().map(|d| d.num_seconds().max(0) as u64);

        let latest = snapshots.iter().rev().find_map(|snapshot| {
            snapshot.windows.iter().find_map(|(label, window)| {
                let label_matches = label == window_label;
                let duration_matches = target_seconds == Some(window.window_seconds);
                if label_matches || duration_matches {
                    Some((label.clone(), window.clone()))
                } else {
                    None
                }
            })
        });

        let Some((label, window)) = latest else {
            return Err(QueryError::WindowUnavailable(window_label.to_string()));
        };

        let summary = if filters.source_daemon.is_none() && filters.event_type.is_none() && filters.priority.is_none()
        {
            serde_json::to_value(&window).unwrap_or(Value::Null)
        } else {
            let mut total = 0u64;
            let mut per_daemon = std::collections::BTreeMap::new();
            for (daemon, by_type) in &window.matrix {
                if let Some(wanted) = &filters.source_daemon {
                    if daemon != wanted {
                        continue;
                    }
                }
                for (event_type, count) in by_type {
                    if let Some(wanted) = &filters.event_type {
                        if event_type != wanted {
                            continue;
                        }
                    }
                    total += count;
                    *per_daemon.entry(daemon.clone()).or_insert(0u64) += count;
                }
            }
            serde_json::json!({ "window_seconds": window.window_seconds, "total_events": total, "per_daemon": per_daemon })
        };

        let anomalies = snapshots
            .last()
            .map(|s| s.anomalies.clone())
            .unwrap_or_default();

        let result = MetricsQueryResult {
            window: label,
            filters: filters.clone(),
            summary,
            anomalies,
            verified_snapshots,
        };
        self.audit(requester, "metrics", filters, 1);
        Ok(result)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
