// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-verifies every broadcast event and raises a critical pulse on
//! mismatch. Grounded in the teacher's watchdog-subscriber shape; unlike
//! the monitoring daemon it keeps no ledger, only an in-memory tally of
//! violations for diagnostics.

use crate::handle::DaemonHandle;
use chrono::Utc;
use parking_lot::Mutex;
use pulse_bus::{PulseBus, Subscription};
use pulse_core::PulseEvent;
use serde_json::json;
use std::sync::Arc;

pub struct IntegrityDaemon {
    bus: PulseBus,
    violations: Mutex<Vec<PulseEvent>>,
    subscription: Mutex<Option<Subscription>>,
}

pub struct IntegrityHandle(pub Arc<IntegrityDaemon>);

impl DaemonHandle for IntegrityHandle {
    fn is_alive(&self) -> bool {
        self.0.subscription.lock().is_some()
    }
}

impl IntegrityDaemon {
    pub fn configure(bus: PulseBus) -> Arc<Self> {
        let daemon = Arc::new(Self {
            bus: bus.clone(),
            violations: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        });
        let handler = daemon.clone();
        let subscription = bus.subscribe(move |event| handler.handle_event(event), None);
        *daemon.subscription.lock() = Some(subscription);
        daemon
    }

    pub fn stop(&self) {
        *self.subscription.lock() = None;
    }

    pub fn violation_count(&self) -> usize {
        self.violations.lock().len()
    }

    fn handle_event(&self, event: &PulseEvent) {
        if self.bus.verify(event) {
            tracing::debug!(event_type = %event.event_type, "integrity check passed");
            return;
        }

        self.violations.lock().push(event.clone());
        let payload = json!({
            "original_event_type": event.event_type,
            "original_source": event.source_daemon,
            "reason": "signature_mismatch",
        });
        let value = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "source_daemon": "integrity",
            "event_type": "integrity_violation",
            "priority": "critical",
            "payload": payload,
        });
        if let Err(error) = self.bus.publish(value) {
            tracing::warn!(%error, "failed to publish integrity_violation pulse");
        }
    }
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
