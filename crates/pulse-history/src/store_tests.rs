// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::TestKeypair;
use pulse_core::{PulseEvent, SignatureManager};
use serde_json::json;

fn signed_event(manager: &SignatureManager, timestamp: &str, value: i64) -> PulseEvent {
    let mut event = PulseEvent::from_value(json!({
        "timestamp": timestamp,
        "source_daemon": "tester",
        "event_type": "unit",
        "payload": {"value": value},
    }))
    .unwrap();
    event.signature = Some(manager.sign(&event).unwrap());
    event
}

#[test]
fn append_creates_one_line_per_date_file() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);

    let store = HistoryStore::new(dir.path().join("history"));
    let event = signed_event(&manager, "2025-01-01T00:00:00Z", 1);
    store.append(&event).unwrap();

    let file = store.root().join("pulse_2025-01-01.jsonl");
    let contents = std::fs::read_to_string(file).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[test]
fn replay_returns_events_in_chronological_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let store = HistoryStore::new(dir.path().join("history"));

    store.append(&signed_event(&manager, "2025-01-01T00:00:00Z", 1)).unwrap();
    store.append(&signed_event(&manager, "2025-01-02T00:00:00Z", 2)).unwrap();

    let replayed = store.replay(None, |e| manager.verify_local(e)).unwrap();
    let values: Vec<i64> = replayed
        .iter()
        .map(|e| e.payload.get("value").and_then(|v| v.as_i64()).unwrap())
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn replay_skips_events_that_fail_verification() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let store = HistoryStore::new(dir.path().join("history"));

    let mut tampered = signed_event(&manager, "2025-01-01T00:00:00Z", 1);
    tampered.payload.insert("value".into(), json!(999));
    store.append(&tampered).unwrap();

    let replayed = store.replay(None, |e| manager.verify_local(e)).unwrap();
    assert!(replayed.is_empty());
}

#[test]
fn replay_skips_malformed_lines_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let store = HistoryStore::new(dir.path().join("history"));

    store.append(&signed_event(&manager, "2025-01-01T00:00:00Z", 1)).unwrap();
    let file = store.root().join("pulse_2025-01-01.jsonl");
    let mut f = std::fs::OpenOptions::new().append(true).open(&file).unwrap();
    writeln!(f, "not valid json").unwrap();

    let replayed = store.replay(None, |e| manager.verify_local(e)).unwrap();
    assert_eq!(replayed.len(), 1);
}

#[test]
fn replay_filters_by_since() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let store = HistoryStore::new(dir.path().join("history"));

    store.append(&signed_event(&manager, "2025-01-01T00:00:00Z", 1)).unwrap();
    store.append(&signed_event(&manager, "2025-01-03T00:00:00Z", 2)).unwrap();

    let since = DateTime::parse_from_rfc3339("2025-01-02T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let replayed = store.replay(Some(since), |e| manager.verify_local(e)).unwrap();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].payload.get("value").unwrap(), 2);
}
