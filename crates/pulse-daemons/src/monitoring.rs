// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windowed aggregation, anomaly thresholds, and signed snapshot emission.
//! Grounded in the teacher's rolling-deque aggregator, with the snapshot
//! timer moved onto a `tokio::time::interval` task rather than invoked
//! synchronously from the event handler.

use crate::handle::DaemonHandle;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_bus::{PulseBus, Subscription};
use pulse_core::{
    AnomalyBreach, AnomalyThreshold, Ledger, MetricsSnapshot, OverallCounts, Priority, PulseEvent,
    SignatureManager, WindowSummary,
};
use pulse_query::{EventFilters, MetricsQueryResult, QueryError, QueryService};
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Entry {
    timestamp: DateTime<Utc>,
    priority: Priority,
    source_daemon: String,
    event_type: String,
}

pub struct MonitoringConfig {
    pub windows: Vec<(String, chrono::Duration)>,
    pub thresholds: Vec<AnomalyThreshold>,
    pub snapshot_interval: StdDuration,
    pub metrics_path: PathBuf,
    /// Threshold-breach log, `MONITORING_GLOW_ROOT/alerts.jsonl`.
    pub alerts_ledger_path: PathBuf,
    /// Audit-trail mirror, `SENTIENTOS_LOG_DIR/monitoring_alerts.jsonl`.
    pub audit_log_path: PathBuf,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            windows: vec![
                ("1m".to_string(), chrono::Duration::minutes(1)),
                ("10m".to_string(), chrono::Duration::minutes(10)),
                ("1h".to_string(), chrono::Duration::hours(1)),
                ("24h".to_string(), chrono::Duration::hours(24)),
            ],
            thresholds: Vec::new(),
            snapshot_interval: StdDuration::from_secs(60),
            metrics_path: PathBuf::from("/glow/monitoring/metrics.jsonl"),
            alerts_ledger_path: PathBuf::from("/glow/monitoring/alerts.jsonl"),
            audit_log_path: PathBuf::from("/glow/logs/monitoring_alerts.jsonl"),
        }
    }
}

struct State {
    windows: BTreeMap<String, VecDeque<Entry>>,
    overall: OverallCounts,
    firing: BTreeMap<String, bool>,
    veil_pending: Vec<String>,
    manifest_updates: Vec<String>,
    last_snapshot: Option<MetricsSnapshot>,
}

pub struct MonitoringDaemon {
    bus: PulseBus,
    signer: Arc<SignatureManager>,
    config: MonitoringConfig,
    state: Mutex<State>,
    alerts_ledger: Ledger,
    audit_log: Ledger,
    query_service: Arc<QueryService>,
    subscription: Mutex<Option<Subscription>>,
    snapshot_task: Mutex<Option<JoinHandle<()>>>,
}

pub struct MonitoringHandle(pub Arc<MonitoringDaemon>);

impl DaemonHandle for MonitoringHandle {
    fn is_alive(&self) -> bool {
        self.0.subscription.lock().is_some()
    }
}

impl MonitoringDaemon {
    pub fn configure(
        bus: PulseBus,
        config: MonitoringConfig,
        signer: Arc<SignatureManager>,
        query_service: Arc<QueryService>,
    ) -> Arc<Self> {
        let alerts_ledger = Ledger::new(config.alerts_ledger_path.clone());
        let audit_log = Ledger::new(config.audit_log_path.clone());
        let daemon = Arc::new(Self {
            bus: bus.clone(),
            signer,
            config,
            state: Mutex::new(State {
                windows: BTreeMap::new(),
                overall: OverallCounts::default(),
                firing: BTreeMap::new(),
                veil_pending: Vec::new(),
                manifest_updates: Vec::new(),
                last_snapshot: None,
            }),
            alerts_ledger,
            audit_log,
            query_service,
            subscription: Mutex::new(None),
            snapshot_task: Mutex::new(None),
        });

        let handler = daemon.clone();
        let subscription = bus.subscribe(move |event| handler.handle_event(event), None);
        *daemon.subscription.lock() = Some(subscription);

        let interval_daemon = daemon.clone();
        let interval = interval_daemon.config.snapshot_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                interval_daemon.persist_snapshot();
            }
        });
        *daemon.snapshot_task.lock() = Some(task);

        daemon
    }

    pub fn stop(&self) {
        *self.subscription.lock() = None;
        if let Some(task) = self.snapshot_task.lock().take() {
            task.abort();
        }
    }

    fn handle_event(&self, event: &PulseEvent) {
        let now = Utc::now();
        let timestamp = DateTime::parse_from_rfc3339(&event.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let priority = event.priority();

        let mut state = self.state.lock();
        state.overall.record(priority, &event.source_daemon, &event.event_type);

        let windows = self.config.windows.clone();
        for (label, span) in &windows {
            let deque = state.windows.entry(label.clone()).or_default();
            let cutoff = now - *span;
            while deque.front().map(|e| e.timestamp < cutoff).unwrap_or(false) {
                deque.pop_front();
            }
            deque.push_back(Entry {
                timestamp,
                priority,
                source_daemon: event.source_daemon.clone(),
                event_type: event.event_type.clone(),
            });
        }

        for threshold in &self.config.thresholds {
            let observed = state
                .windows
                .get(&window_label_for(&windows, threshold.window_seconds))
                .map(|deque| count_matching(deque, threshold))
                .unwrap_or(0);

            let already_firing = *state.firing.get(&threshold.name).unwrap_or(&false);
            if observed > threshold.limit {
                if !already_firing {
                    state.firing.insert(threshold.name.clone(), true);
                    self.fire_alert(threshold, observed);
                }
            } else {
                state.firing.insert(threshold.name.clone(), false);
            }
        }

        match event.event_type.as_str() {
            "veil_request" => {
                if let Some(patch_id) = event.payload.get("patch_id").and_then(|v| v.as_str()) {
                    if !state.veil_pending.iter().any(|p| p == patch_id) {
                        state.veil_pending.push(patch_id.to_string());
                    }
                }
            }
            "veil_confirmed" | "veil_rejected" => {
                if let Some(patch_id) = event.payload.get("patch_id").and_then(|v| v.as_str()) {
                    state.veil_pending.retain(|p| p != patch_id);
                }
            }
            "manifest_update" => {
                if let Some(signature) = event.payload.get("signature").and_then(|v| v.as_str()) {
                    state.manifest_updates.push(signature.to_string());
                    if state.manifest_updates.len() > 50 {
                        state.manifest_updates.remove(0);
                    }
                }
            }
            _ => {}
        }
    }

    fn fire_alert(&self, threshold: &AnomalyThreshold, observed: u64) {
        let payload = json!({
            "source_daemon": threshold.source_daemon,
            "priority": threshold.priority.as_str(),
            "window_seconds": threshold.window_seconds,
            "threshold": threshold.limit,
            "observed": observed,
            "event_type": threshold.event_type,
            "name": threshold.name,
        });
        let value = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "source_daemon": "monitoring",
            "event_type": "monitor_alert",
            "priority": "critical",
            "payload": payload,
        });
        if let Err(error) = self.bus.publish(value) {
            tracing::warn!(%error, "failed to publish monitor_alert pulse");
        }
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "name": threshold.name,
            "observed": observed,
            "limit": threshold.limit,
            "window_seconds": threshold.window_seconds,
        });
        if let Err(error) = self.alerts_ledger.append(&entry) {
            tracing::warn!(%error, "failed to append monitoring alert entry");
        }
        if let Err(error) = self.audit_log.append(&entry) {
            tracing::warn!(%error, "failed to append monitoring alert audit entry");
        }
    }

    /// Compute the full metrics record, sign it, append it to the metrics
    /// path, and publish a `monitor_summary` pulse. Driven by the snapshot
    /// timer, never called synchronously from the event handler.
    pub fn persist_snapshot(&self) {
        let snapshot = {
            let state = self.state.lock();
            let windows = state
                .windows
                .iter()
                .map(|(label, deque)| (label.clone(), summarize_window(label, &self.config.windows, deque)))
                .collect();
            MetricsSnapshot {
                timestamp: Utc::now().to_rfc3339(),
                overall: state.overall.clone(),
                windows,
                anomalies: self.current_anomalies(&state),
                veil_pending: state.veil_pending.clone(),
                manifest_updates: state.manifest_updates.clone(),
                signature: None,
            }
        };

        let mut snapshot = snapshot;
        if let Err(error) = snapshot.sign(&self.signer) {
            tracing::warn!(%error, "failed to sign monitoring snapshot");
            return;
        }

        let path = self.config.metrics_path.clone();
        if let Some(parent) = path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::warn!(%error, "failed to create monitoring metrics directory");
                return;
            }
        }
        let append_result = (|| -> std::io::Result<()> {
            use std::io::Write;
            let line = serde_json::to_string(&snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{line}")
        })();
        if let Err(error) = append_result {
            tracing::warn!(%error, "failed to append monitoring snapshot");
            return;
        }

        self.state.lock().last_snapshot = Some(snapshot.clone());

        let value = json!({
            "timestamp": snapshot.timestamp,
            "source_daemon": "monitoring",
            "event_type": "monitor_summary",
            "priority": "info",
            "payload": serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null),
        });
        if let Err(error) = self.bus.publish(value) {
            tracing::warn!(%error, "failed to publish monitor_summary pulse");
        }
    }

    fn current_anomalies(&self, state: &State) -> Vec<AnomalyBreach> {
        self.config
            .thresholds
            .iter()
            .filter(|t| *state.firing.get(&t.name).unwrap_or(&false))
            .map(|t| AnomalyBreach {
                name: t.name.clone(),
                source_daemon: t.source_daemon.clone(),
                priority: Some(t.priority),
                event_type: t.event_type.clone(),
                window_seconds: t.window_seconds,
                limit: t.limit,
                observed: state
                    .windows
                    .get(&window_label_for(&self.config.windows, t.window_seconds))
                    .map(|d| count_matching(d, t))
                    .unwrap_or(0),
            })
            .collect()
    }

    /// In-memory record as of the last computed snapshot.
    pub fn current_metrics(&self) -> Option<MetricsSnapshot> {
        self.state.lock().last_snapshot.clone()
    }

    pub fn query(&self, window_label: &str, filters: &EventFilters) -> Result<MetricsQueryResult, QueryError> {
        self.query_service.query_metrics(window_label, filters, "monitoring")
    }
}

fn count_matching(deque: &VecDeque<Entry>, threshold: &AnomalyThreshold) -> u64 {
    deque
        .iter()
        .filter(|e| {
            e.priority == threshold.priority
                && threshold.source_daemon.as_deref().map(|d| d == e.source_daemon).unwrap_or(true)
                && threshold.event_type.as_deref().map(|t| t == e.event_type).unwrap_or(true)
        })
        .count() as u64
}

fn window_label_for(windows: &[(String, chrono::Duration)], seconds: u64) -> String {
    windows
        .iter()
        .find(|(_, d)| d.num_seconds().max(0) as u64 == seconds)
        .map(|(label, _)| label.clone())
        .unwrap_or_default()
}

fn summarize_window(label: &str, windows: &[(String, chrono::Duration)], deque: &VecDeque<Entry>) -> WindowSummary {
    let window_seconds = windows
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, d)| d.num_seconds().max(0) as u64)
        .unwrap_or(0);
    let total_events = deque.len() as u64;
    let minutes = (window_seconds as f64 / 60.0).max(f64::EPSILON);
    let hours = (window_seconds as f64 / 3600.0).max(f64::EPSILON);

    let mut per_daemon = BTreeMap::new();
    let mut matrix: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    for entry in deque {
        *per_daemon.entry(entry.source_daemon.clone()).or_insert(0u64) += 1;
        *matrix
            .entry(entry.source_daemon.clone())
            .or_default()
            .entry(entry.event_type.clone())
            .or_insert(0) += 1;
    }

    WindowSummary {
        window_seconds,
        total_events,
        rate_per_minute: total_events as f64 / minutes,
        rate_per_hour: total_events as f64 / hours,
        per_daemon,
        matrix,
    }
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
