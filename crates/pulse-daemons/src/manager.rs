// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon registry and pulse-driven restart handling. Grounded in the
//! teacher's registry-plus-lifecycle-callback shape, but `start_fn`/`stop_fn`
//! are fixed-signature [`crate::handle::DaemonHandle`] trait objects rather
//! than the source's reflectively-inspected callables — see `DESIGN.md` for
//! the Open Question this resolves.

use crate::error::DaemonManagerError;
use crate::handle::{DaemonHandle, StartFn, StopFn};
use crate::record::{DaemonRecord, DaemonStatus};
use chrono::Utc;
use parking_lot::Mutex;
use pulse_bus::{PulseBus, Subscription};
use pulse_core::{Ledger, Priority, PulseEvent};
use pulse_federation::FederationLink;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RestartOutcome {
    pub outcome: String,
    pub error: Option<String>,
}

pub struct DaemonManager {
    state: Mutex<HashMap<String, DaemonRecord>>,
    bus: PulseBus,
    ledger: Ledger,
    federation: Option<Arc<FederationLink>>,
    subscription: Mutex<Option<Subscription>>,
}

impl DaemonManager {
    fn new(bus: PulseBus, ledger_path: impl Into<PathBuf>, federation: Option<Arc<FederationLink>>) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            bus,
            ledger: Ledger::new(ledger_path),
            federation,
            subscription: Mutex::new(None),
        }
    }

    /// Build the manager and install its critical-only restart-request
    /// subscription.
    pub fn configure(
        bus: PulseBus,
        ledger_path: impl Into<PathBuf>,
        federation: Option<Arc<FederationLink>>,
    ) -> Arc<Self> {
        let manager = Arc::new(Self::new(bus.clone(), ledger_path, federation));
        let handler = manager.clone();
        let mut filter = HashSet::new();
        filter.insert(Priority::Critical);
        let subscription = bus.subscribe(move |event| handler.handle_pulse(event), Some(filter));
        *manager.subscription.lock() = Some(subscription);
        manager
    }

    pub fn register(&self, name: impl Into<String>, start_fn: StartFn, stop_fn: StopFn) -> Result<(), DaemonManagerError> {
        let name = name.into();
        let mut state = self.state.lock();
        if state.contains_key(&name) {
            return Err(DaemonManagerError::AlreadyRegistered(name));
        }
        state.insert(name, DaemonRecord { start_fn, stop_fn, instance: None, status: DaemonStatus::default() });
        Ok(())
    }

    pub fn status(&self, name: &str) -> Option<DaemonStatus> {
        self.state.lock().get(name).map(|r| r.status.clone())
    }

    pub fn reset(&self) {
        self.state.lock().clear();
        *self.subscription.lock() = None;
    }

    /// Stop the previous instance (if any), start a new one, record the
    /// outcome, append a ledger entry, and publish a `daemon_restart` pulse.
    #[allow(clippy::expect_used)]
    pub fn restart(
        &self,
        name: &str,
        reason: Option<String>,
        requested_by: Option<String>,
        scope: Option<String>,
    ) -> Result<RestartOutcome, DaemonManagerError> {
        let reason = reason.unwrap_or_else(|| "unspecified".to_string());
        let scope = scope.unwrap_or_else(|| "local".to_string());
        let requested_by = requested_by.unwrap_or_else(|| "local".to_string());

        let previous = {
            let mut state = self.state.lock();
            let record = state.get_mut(name).ok_or_else(|| DaemonManagerError::Unknown(name.to_string()))?;
            record.instance.take()
        };

        let mut stop_error: Option<String> = None;
        if let Some(previous) = previous {
            let mut state = self.state.lock();
            let record = state.get_mut(name).expect("checked present above");
            if let Err(e) = (record.stop_fn)(previous) {
                stop_error = Some(format!("stop_failed:{e}"));
            }
        }

        let mut start_error: Option<String> = None;
        let mut new_instance: Option<Box<dyn DaemonHandle>> = None;
        if stop_error.is_none() {
            let mut state = self.state.lock();
            let record = state.get_mut(name).expect("checked present above");
            match (record.start_fn)() {
                Ok(instance) => new_instance = Some(instance),
                Err(e) => start_error = Some(e.to_string()),
            }
        }

        let alive = new_instance.as_ref().map(|i| i.is_alive()).unwrap_or(false);
        let outcome = if stop_error.is_none() && start_error.is_none() && alive { "success" } else { "failure" };
        let error = stop_error.or(start_error);

        {
            let mut state = self.state.lock();
            let record = state.get_mut(name).expect("checked present above");
            record.status.running = outcome == "success";
            record.status.last_restart = Some(Utc::now().to_rfc3339());
            record.status.last_reason = Some(reason.clone());
            record.status.last_outcome = Some(outcome.to_string());
            record.status.last_error = error.clone();
            // A stopped-but-failed instance is no longer safely ours to hold:
            // `stop_fn` consumed it by value, so unlike the source's
            // reference-juggling there is nothing to rebind on failure.
            record.instance = if outcome == "success" { new_instance } else { None };
        }

        let ledger_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "daemon": name,
            "reason": reason,
            "outcome": outcome,
            "scope": scope,
            "source_peer": requested_by,
            "error": error,
        });
        if let Err(e) = self.ledger.append(&ledger_entry) {
            tracing::warn!(error = %e, "failed to append daemon restart ledger entry");
        }

        let priority = if outcome == "success" { "info" } else { "critical" };
        let payload = json!({
            "daemon_name": name,
            "daemon": name,
            "reason": reason,
            "outcome": outcome,
            "scope": scope,
            "requested_by": requested_by,
            "error": error,
        });
        let value = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "source_daemon": "daemon_manager",
            "event_type": "daemon_restart",
            "priority": priority,
            "payload": payload,
        });
        if let Err(e) = self.bus.publish(value) {
            tracing::warn!(error = %e, "failed to publish daemon_restart pulse");
        }

        Ok(RestartOutcome { outcome: outcome.to_string(), error })
    }

    fn handle_pulse(&self, event: &PulseEvent) {
        if event.payload.get("action").and_then(Value::as_str) != Some("restart_daemon") {
            return;
        }
        let daemon = event
            .payload
            .get("daemon")
            .or_else(|| event.payload.get("daemon_name"))
            .or_else(|| event.payload.get("target"))
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty());
        let Some(daemon) = daemon else { return };

        let reason = event.payload.get("reason").and_then(Value::as_str).map(str::to_string);
        let scope = event.payload.get("scope").and_then(Value::as_str).unwrap_or("local").to_string();

        let requester = if scope == "federated" {
            if event.source_peer.is_empty() || event.source_peer == "local" {
                tracing::warn!("federated restart_request rejected: no peer source");
                return;
            }
            match &self.federation {
                Some(federation) if federation.registry().get(&event.source_peer).is_some() => {}
                _ => {
                    tracing::warn!(peer = %event.source_peer, "federated restart_request rejected: peer not trusted");
                    return;
                }
            }
            if !self.bus.verify(event) {
                tracing::warn!("federated restart_request rejected: signature invalid");
                return;
            }
            event.source_peer.clone()
        } else {
            "local".to_string()
        };

        if let Err(e) = self.restart(daemon, reason, Some(requester), Some(scope)) {
            tracing::warn!(daemon = %daemon, error = %e, "restart_request: unknown daemon, no-op");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
