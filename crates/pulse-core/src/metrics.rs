// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The monitoring daemon's signed telemetry record. Shared between
//! `pulse-daemons` (which produces it) and `pulse-query` (which reads and
//! re-verifies it) to avoid a dependency cycle between those two crates.

use crate::error::PulseError;
use crate::event::{canonical_value_bytes, Priority};
use crate::signature::SignatureManager;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub info: u64,
    pub warning: u64,
    pub critical: u64,
}

impl PriorityCounts {
    pub fn increment(&mut self, priority: Priority) {
        match priority {
            Priority::Info => self.info += 1,
            Priority::Warning => self.warning += 1,
            Priority::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.info + self.warning + self.critical
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallCounts {
    pub by_priority: PriorityCounts,
    pub by_source_daemon: BTreeMap<String, u64>,
    pub by_event_type: BTreeMap<String, u64>,
    /// source_daemon -> event_type -> count
    pub matrix: BTreeMap<String, BTreeMap<String, u64>>,
}

impl OverallCounts {
    pub fn record(&mut self, priority: Priority, source_daemon: &str, event_type: &str) {
        self.by_priority.increment(priority);
        *self.by_source_daemon.entry(source_daemon.to_string()).or_insert(0) += 1;
        *self.by_event_type.entry(event_type.to_string()).or_insert(0) += 1;
        *self
            .matrix
            .entry(source_daemon.to_string())
            .or_default()
            .entry(event_type.to_string())
            .or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window_seconds: u64,
    pub total_events: u64,
    pub rate_per_minute: f64,
    pub rate_per_hour: f64,
    pub per_daemon: BTreeMap<String, u64>,
    pub matrix: BTreeMap<String, BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyBreach {
    pub name: String,
    pub source_daemon: Option<String>,
    pub priority: Option<Priority>,
    pub event_type: Option<String>,
    pub window_seconds: u64,
    pub limit: u64,
    pub observed: u64,
}

/// A configured anomaly threshold: when the observed count of matching
/// events within `window_seconds` exceeds `limit`, the monitoring daemon
/// fires a `monitor_alert` critical pulse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyThreshold {
    pub name: String,
    pub priority: Priority,
    pub limit: u64,
    pub window_seconds: u64,
    #[serde(default)]
    pub source_daemon: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub overall: OverallCounts,
    pub windows: BTreeMap<String, WindowSummary>,
    pub anomalies: Vec<AnomalyBreach>,
    pub veil_pending: Vec<String>,
    pub manifest_updates: Vec<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl MetricsSnapshot {
    /// Canonical bytes signed over: the record with `signature` removed,
    /// keys sorted, compact JSON — the same scheme as a `PulseEvent`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        canonical_value_bytes(&value, &["signature"])
    }

    pub fn sign(&mut self, signer: &SignatureManager) -> Result<(), PulseError> {
        self.signature = None;
        let bytes = self.canonical_bytes();
        self.signature = Some(signer.sign_bytes(&bytes)?);
        Ok(())
    }

    pub fn verify(&self, verify_key: &VerifyingKey) -> bool {
        match &self.signature {
            Some(sig) => SignatureManager::verify_bytes_with_key(&self.canonical_bytes(), sig, verify_key),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestKeypair;

    fn sample() -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            overall: OverallCounts::default(),
            windows: BTreeMap::new(),
            anomalies: Vec::new(),
            veil_pending: Vec::new(),
            manifest_updates: Vec::new(),
            signature: None,
        }
    }

    #[test]
    fn unsigned_snapshot_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let keys = TestKeypair::generate(dir.path());
        let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
        let verify_key = signer.local_verify_key().unwrap();
        assert!(!sample().verify(&verify_key));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let keys = TestKeypair::generate(dir.path());
        let signer = SignatureManager::new(&keys.signing_key_path, &keys.verify_key_path);
        let verify_key = signer.local_verify_key().unwrap();

        let mut snapshot = sample();
        snapshot.sign(&signer).unwrap();
        assert!(snapshot.verify(&verify_key));

        snapshot.overall.by_priority.increment(Priority::Critical);
        assert!(!snapshot.verify(&verify_key));
    }
}
