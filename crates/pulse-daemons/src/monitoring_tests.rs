// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::TestKeypair;
use pulse_core::SignatureManager;
use pulse_history::HistoryStore;
use serde_json::json;
use std::collections::BTreeMap;

fn harness(dir: &std::path::Path) -> (PulseBus, Arc<SignatureManager>, Arc<QueryService>) {
    let keys = TestKeypair::generate(dir);
    let signer = Arc::new(SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path));
    let verify_key = signer.local_verify_key().unwrap();
    let history = HistoryStore::new(dir.join("history"));
    let bus = PulseBus::new(history, SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path));

    let query_service = Arc::new(QueryService::new(
        dir.join("history"),
        dir.join("monitoring/metrics.jsonl"),
        dir.join("audit.jsonl"),
        verify_key,
    ));

    (bus, signer, query_service)
}

fn publish(bus: &PulseBus, event_type: &str, priority: &str, source: &str) {
    bus.publish(json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "source_daemon": source,
        "event_type": event_type,
        "priority": priority,
        "payload": {},
    }))
    .unwrap();
}

#[tokio::test]
async fn snapshot_reflects_published_events() {
    let dir = tempfile::tempdir().unwrap();
    let (bus, signer, query_service) = harness(dir.path());

    let config = MonitoringConfig {
        metrics_path: dir.path().join("monitoring/metrics.jsonl"),
        alerts_ledger_path: dir.path().join("alerts.jsonl"),
        snapshot_interval: std::time::Duration::from_secs(3600),
        ..MonitoringConfig::default()
    };

    let daemon = MonitoringDaemon::configure(bus.clone(), config, signer, query_service);

    publish(&bus, "unit", "info", "tester");
    publish(&bus, "unit", "warning", "tester");

    daemon.persist_snapshot();

    let snapshot = daemon.current_metrics().unwrap();
    assert_eq!(snapshot.overall.by_priority.total(), 2);
    assert!(snapshot.signature.is_some());

    let summary = snapshot.windows.get("1m").unwrap();
    assert_eq!(summary.total_events, 2);

    daemon.stop();
}

#[tokio::test]
async fn threshold_breach_publishes_monitor_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (bus, signer, query_service) = harness(dir.path());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut filter = std::collections::HashSet::new();
    filter.insert(Priority::Critical);
    let _sub = bus.subscribe(move |e| sink.lock().push(e.clone()), Some(filter));

    let config = MonitoringConfig {
        metrics_path: dir.path().join("monitoring/metrics.jsonl"),
        alerts_ledger_path: dir.path().join("alerts.jsonl"),
        audit_log_path: dir.path().join("monitoring_alerts.jsonl"),
        snapshot_interval: std::time::Duration::from_secs(3600),
        thresholds: vec![AnomalyThreshold {
            name: "too_many_warnings".to_string(),
            priority: Priority::Warning,
            limit: 1,
            window_seconds: 60,
            source_daemon: None,
            event_type: None,
        }],
        ..MonitoringConfig::default()
    };

    let daemon = MonitoringDaemon::configure(bus.clone(), config, signer, query_service);

    publish(&bus, "unit", "warning", "tester");
    publish(&bus, "unit", "warning", "tester");

    let alerts: Vec<_> = received.lock().iter().filter(|e| e.event_type == "monitor_alert").cloned().collect();
    assert_eq!(alerts.len(), 1);

    let alert_ledger = std::fs::read_to_string(dir.path().join("alerts.jsonl")).unwrap();
    assert_eq!(alert_ledger.lines().count(), 1);

    let audit_log = std::fs::read_to_string(dir.path().join("monitoring_alerts.jsonl")).unwrap();
    assert_eq!(audit_log.lines().count(), 1);

    daemon.stop();
}

#[tokio::test]
async fn query_resolves_signed_window() {
    let dir = tempfile::tempdir().unwrap();
    let (bus, signer, query_service) = harness(dir.path());

    let config = MonitoringConfig {
        metrics_path: dir.path().join("monitoring/metrics.jsonl"),
        alerts_ledger_path: dir.path().join("alerts.jsonl"),
        snapshot_interval: std::time::Duration::from_secs(3600),
        ..MonitoringConfig::default()
    };

    let daemon = MonitoringDaemon::configure(bus.clone(), config, signer, query_service);
    publish(&bus, "unit", "info", "tester");
    daemon.persist_snapshot();

    let filters = EventFilters::from_raw(&BTreeMap::new()).unwrap();
    let result = daemon.query("1m", &filters).unwrap();
    assert_eq!(result.window, "1m");

    daemon.stop();
}
