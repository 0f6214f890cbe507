// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::TestKeypair;
use pulse_core::{Priority, SignatureManager};
use pulse_history::HistoryStore;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

fn test_bus(dir: &std::path::Path) -> PulseBus {
    let keys = TestKeypair::generate(dir);
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let history = HistoryStore::new(dir.join("history"));
    PulseBus::new(history, signer)
}

fn sample() -> Value {
    json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "source_daemon": "tester",
        "event_type": "unit",
        "payload": {"value": 1},
    })
}

#[test]
fn publish_signs_persists_and_delivers_to_subscriber() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let _sub = bus.subscribe(move |e| sink.lock().push(e.clone()), None);

    let stored = bus.publish(sample()).unwrap();
    assert_eq!(stored.source_peer, "local");
    assert!(stored.signature.is_some());
    assert!(bus.verify(&stored));

    let delivered = received.lock();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].timestamp, stored.timestamp);
}

#[test]
fn subscribe_replays_queued_backlog_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    bus.publish(sample()).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let _sub = bus.subscribe(move |_| { seen.fetch_add(1, Ordering::SeqCst); }, None);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn priority_filter_excludes_unlisted_events() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut filter = HashSet::new();
    filter.insert(Priority::Critical);
    let _sub = bus.subscribe(move |e| sink.lock().push(e.clone()), Some(filter));

    bus.publish(sample()).unwrap();
    assert!(received.lock().is_empty());

    let mut critical = sample();
    critical["priority"] = json!("critical");
    bus.publish(critical).unwrap();
    assert_eq!(received.lock().len(), 1);
}

#[test]
fn unsubscribe_stops_future_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let sub = bus.subscribe(move |_| { seen.fetch_add(1, Ordering::SeqCst); }, None);
    bus.publish(sample()).unwrap();
    sub.unsubscribe();
    bus.publish(sample()).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn ingest_rejects_tampered_remote_event() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let peer_dir = tempfile::tempdir().unwrap();
    let peer_keys = TestKeypair::generate(peer_dir.path());
    let peer_signer = SignatureManager::new(&peer_keys.signing_key_path, &peer_keys.verify_key_path);
    let peer_verify_key = peer_signer.local_verify_key().unwrap();
    bus.set_peer_verifier(move |e| pulse_core::SignatureManager::verify_with_key(e, &peer_verify_key));

    let mut remote = pulse_core::PulseEvent::from_value(sample()).unwrap();
    remote.signature = Some(peer_signer.sign(&remote).unwrap());
    let ok = serde_json::to_value(&remote).unwrap();

    let accepted = bus.ingest(ok, "peer-alpha").unwrap();
    assert_eq!(accepted.source_peer, "peer-alpha");

    let mut tampered = remote.clone();
    tampered.payload.insert("value".into(), json!(999));
    let tampered_value = serde_json::to_value(&tampered).unwrap();
    let err = bus.ingest(tampered_value, "peer-alpha");
    assert!(err.is_err());

    let replayed = bus.replay(None).unwrap();
    assert_eq!(replayed.len(), 1);
}

#[test]
fn ingest_without_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let err = bus.ingest(sample(), "peer-alpha");
    assert!(err.is_err());
}

#[test]
fn reentrant_publish_from_handler_does_not_deadlock() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let inner_bus = bus.clone();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_check = fired.clone();
    let _sub = bus.subscribe(
        move |e| {
            if e.payload.get("value").and_then(|v| v.as_i64()) == Some(1) {
                fired_check.fetch_add(1, Ordering::SeqCst);
                let mut follow_up = sample();
                follow_up["payload"]["value"] = json!(2);
                inner_bus.publish(follow_up).unwrap();
            }
        },
        None,
    );
    bus.publish(sample()).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(bus.pending_events().len(), 2);
}

#[test]
fn consume_events_drains_queue() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    bus.publish(sample()).unwrap();
    bus.publish(sample()).unwrap();
    assert_eq!(bus.pending_events().len(), 2);
    let drained = bus.consume_events(Some(1));
    assert_eq!(drained.len(), 1);
    assert_eq!(bus.pending_events().len(), 1);
}

#[test]
fn reset_clears_queue_and_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let _sub = bus.subscribe(|_| {}, None);
    bus.publish(sample()).unwrap();
    bus.reset();
    assert!(bus.pending_events().is_empty());
}
