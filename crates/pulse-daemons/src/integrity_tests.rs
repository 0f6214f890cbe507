// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::TestKeypair;
use pulse_core::SignatureManager;
use pulse_history::HistoryStore;
use serde_json::json;

fn test_bus(dir: &std::path::Path) -> PulseBus {
    let keys = TestKeypair::generate(dir);
    let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
    let history = HistoryStore::new(dir.join("history"));
    PulseBus::new(history, signer)
}

#[test]
fn locally_published_events_pass_integrity_check() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let daemon = IntegrityDaemon::configure(bus.clone());

    bus.publish(json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "source_daemon": "tester",
        "event_type": "unit",
        "payload": {},
    }))
    .unwrap();

    assert_eq!(daemon.violation_count(), 0);
}

#[test]
fn forged_event_raises_violation_pulse() {
    let dir = tempfile::tempdir().unwrap();
    let bus = test_bus(dir.path());
    let daemon = IntegrityDaemon::configure(bus.clone());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let mut filter = std::collections::HashSet::new();
    filter.insert(pulse_core::Priority::Critical);
    let _sub = bus.subscribe(move |e| sink.lock().push(e.clone()), Some(filter));

    // Construct an event with a bogus signature directly, bypassing
    // publish()/ingest() (which would refuse to ever enqueue it), to
    // exercise the daemon's own re-verification in isolation.
    let forged = pulse_core::PulseEvent::from_value(json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "source_daemon": "peer-daemon",
        "event_type": "unit",
        "payload": {},
        "signature": "AAAA",
    }))
    .unwrap();

    daemon.handle_event(&forged);

    assert_eq!(daemon.violation_count(), 1);
    let pulses = received.lock();
    assert_eq!(pulses.len(), 1);
    assert_eq!(pulses[0].event_type, "integrity_violation");
    assert_eq!(pulses[0].payload.get("original_source").and_then(|v| v.as_str()), Some("peer-daemon"));

    daemon.stop();
}
