// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::TestKeypair;
use pulse_history::HistoryStore;
use serde_json::json;

fn signed_event(signer: &SignatureManager, timestamp: &str, source: &str, kind: &str) -> PulseEvent {
    let mut event = PulseEvent::from_value(json!({
        "timestamp": timestamp,
        "source_daemon": source,
        "event_type": kind,
        "payload": {},
    }))
    .unwrap();
    event.signature = Some(signer.sign(&event).unwrap());
    event
}

#[test]
fn query_events_returns_only_verified_local_events_matching_filters() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let verify_key = signer.local_verify_key().unwrap();

    let history_root = dir.path().join("history");
    let store = HistoryStore::new(&history_root);
    store.append(&signed_event(&signer, "2025-01-01T00:00:00Z", "monitor", "heartbeat")).unwrap();
    store.append(&signed_event(&signer, "2025-01-01T01:00:00Z", "codex", "predictive_suggestion")).unwrap();

    let service = QueryService::new(
        &history_root,
        dir.path().join("metrics.jsonl"),
        dir.path().join("ledger.jsonl"),
        verify_key,
    );

    let since = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
    let mut raw = std::collections::BTreeMap::new();
    raw.insert("source_daemon".to_string(), "monitor".to_string());
    let filters = EventFilters::from_raw(&raw).unwrap();

    let events = service.query_events(since, &filters, "tester").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source_daemon, "monitor");
}

#[test]
fn query_events_rejects_unsafe_history_root() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let verify_key = signer.local_verify_key().unwrap();

    let service = QueryService::new(
        "/vow/pulse_history",
        dir.path().join("metrics.jsonl"),
        dir.path().join("ledger.jsonl"),
        verify_key,
    );
    let since = Utc::now();
    let err = service.query_events(since, &EventFilters::default(), "tester");
    assert!(matches!(err, Err(QueryError::PermissionDenied(_))));
}

#[test]
fn query_metrics_returns_unavailable_for_unknown_window() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let verify_key = signer.local_verify_key().unwrap();

    let service = QueryService::new(
        dir.path().join("history"),
        dir.path().join("metrics.jsonl"),
        dir.path().join("ledger.jsonl"),
        verify_key,
    );
    let err = service.query_metrics("1h", &EventFilters::default(), "tester");
    assert!(matches!(err, Err(QueryError::WindowUnavailable(_))));
}

#[test]
fn query_metrics_reads_signed_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let verify_key = signer.local_verify_key().unwrap();

    let mut snapshot = MetricsSnapshot {
        timestamp: "2025-01-01T00:00:00Z".to_string(),
        overall: pulse_core::OverallCounts::default(),
        windows: std::collections::BTreeMap::new(),
        anomalies: Vec::new(),
        veil_pending: Vec::new(),
        manifest_updates: Vec::new(),
        signature: None,
    };
    snapshot.windows.insert(
        "1h".to_string(),
        pulse_core::WindowSummary {
            window_seconds: 3600,
            total_events: 5,
            rate_per_minute: 0.08,
            rate_per_hour: 5.0,
            per_daemon: std::collections::BTreeMap::new(),
            matrix: std::collections::BTreeMap::new(),
        },
    );
    snapshot.sign(&signer).unwrap();

    let metrics_path = dir.path().join("metrics.jsonl");
    std::fs::write(&metrics_path, format!("{}\n", serde_json::to_string(&snapshot).unwrap())).unwrap();

    let service = QueryService::new(dir.path().join("history"), &metrics_path, dir.path().join("ledger.jsonl"), verify_key);
    let result = service.query_metrics("1h", &EventFilters::default(), "tester").unwrap();
    assert_eq!(result.window, "1h");
    assert_eq!(result.verified_snapshots.len(), 1);
}
