// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::TestKeypair;
use serde_json::json;

fn sample_event() -> PulseEvent {
    PulseEvent::from_value(json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "source_daemon": "tester",
        "event_type": "unit",
        "payload": {"value": 1},
    }))
    .unwrap()
}

#[test]
fn sign_then_verify_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);

    let mut event = sample_event();
    let sig = manager.sign(&event).unwrap();
    event.signature = Some(sig);

    assert!(manager.verify_local(&event));
}

#[test]
fn tampering_with_payload_invalidates_signature() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);

    let mut event = sample_event();
    let sig = manager.sign(&event).unwrap();
    event.signature = Some(sig);
    event.payload.insert("value".into(), json!(999));

    assert!(!manager.verify_local(&event));
}

#[test]
fn missing_signature_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);

    let event = sample_event();
    assert!(!manager.verify_local(&event));
}

#[test]
fn missing_signing_key_is_fatal_to_sign() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SignatureManager::new(
        dir.path().join("missing_private.key"),
        dir.path().join("missing_public.key"),
    );
    let err = manager.sign(&sample_event()).unwrap_err();
    assert!(matches!(err, PulseError::ConfigurationMissing(_)));
}

#[test]
fn re_signing_after_stripping_signature_reproduces_a_verifying_signature() {
    let dir = tempfile::tempdir().unwrap();
    let keys = TestKeypair::generate(dir.path());
    let manager = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);

    let mut event = sample_event();
    let sig1 = manager.sign(&event).unwrap();
    event.signature = Some(sig1.clone());
    event.signature = None;
    let sig2 = manager.sign(&event).unwrap();
    assert_eq!(sig1, sig2);
}
