// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replicates verified pulses across a small named peer set. Outbound sends
//! run on a private worker task fed by an internal channel, matching the
//! teacher's dispatch-to-task shape for work a handler must not block on;
//! inbound ingestion and replay fetch delegate straight to the bus's
//! `ingest` path once the peer verifier is installed.

use crate::config::FederationConfig;
use crate::error::FederationError;
use crate::registry::PeerRegistry;
use parking_lot::Mutex;
use pulse_bus::{PulseBus, Subscription};
use pulse_core::{PulseEvent, SignatureManager};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct OutboundJob {
    endpoint: String,
    body: Value,
}

fn contains_denylisted(canonical: &str, denylist: &[String]) -> bool {
    let lowered = canonical.to_ascii_lowercase();
    denylist.iter().any(|pattern| lowered.contains(&pattern.to_ascii_lowercase()))
}

pub struct FederationLink {
    bus: PulseBus,
    registry: Arc<PeerRegistry>,
    enabled: bool,
    denylist: Vec<String>,
    http: reqwest::Client,
    tx: mpsc::UnboundedSender<OutboundJob>,
    subscription: Mutex<Option<Subscription>>,
}

impl FederationLink {
    /// Load the peer registry, install the bus's peer-aware verifier, and
    /// (if enabled with a non-empty peer set) subscribe to every
    /// locally-originated publication for outbound forwarding.
    pub fn configure(
        bus: PulseBus,
        config: FederationConfig,
        keys_dir: &Path,
    ) -> Result<Arc<Self>, FederationError> {
        let registry = Arc::new(PeerRegistry::load(keys_dir, &config.peers)?);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundJob>();
        let worker_http = http.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(error) = worker_http.post(&job.endpoint).json(&job.body).send().await {
                    tracing::warn!(endpoint = %job.endpoint, %error, "federation outbound send failed");
                }
            }
        });

        let link = Arc::new(Self {
            bus: bus.clone(),
            registry: registry.clone(),
            enabled: config.enabled,
            denylist: config.denylist,
            http,
            tx,
            subscription: Mutex::new(None),
        });

        let verify_registry = registry.clone();
        bus.set_peer_verifier(move |event| {
            verify_registry
                .get(&event.source_peer)
                .map(|peer| SignatureManager::verify_with_key(event, &peer.verify_key))
                .unwrap_or(false)
        });

        if config.enabled && !registry.is_empty() {
            let outbound = link.clone();
            let sub = bus.subscribe(move |event| outbound.handle_outbound(event), None);
            *link.subscription.lock() = Some(sub);
        }

        Ok(link)
    }

    fn handle_outbound(&self, event: &PulseEvent) {
        if event.source_peer != "local" {
            return;
        }
        let canonical = String::from_utf8_lossy(&pulse_core::canonical_bytes(event)).into_owned();
        if contains_denylisted(&canonical, &self.denylist) {
            tracing::warn!(event_type = %event.event_type, "refusing to forward privileged event");
            return;
        }
        let body = event.to_value();
        for peer in self.registry.iter() {
            let endpoint = format!("{}/pulse/federation", peer.endpoint);
            let _ = self.tx.send(OutboundJob { endpoint, body: body.clone() });
        }
    }

    /// Accept a pre-signed event claimed to originate from `peer_name`.
    /// Verification and persistence are delegated to the bus's `ingest`
    /// path, which consults the peer verifier installed at `configure` time.
    pub fn ingest_remote_event(
        &self,
        value: Value,
        peer_name: &str,
    ) -> Result<PulseEvent, FederationError> {
        if !self.enabled {
            return Err(FederationError::Disabled);
        }
        if self.registry.get(peer_name).is_none() {
            return Err(FederationError::UnknownPeer(peer_name.to_string()));
        }
        self.bus.ingest(value, peer_name).map_err(FederationError::from)
    }

    /// Fetch and ingest recent events from every registered peer. Invalid
    /// items are logged and skipped; returns the number accepted.
    pub async fn request_recent_events(&self, minutes: i64) -> Result<usize, FederationError> {
        let mut accepted = 0usize;
        for peer in self.registry.iter() {
            let url = format!("{}/pulse/federation?minutes={minutes}", peer.endpoint);
            let response = match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(error) => {
                    tracing::warn!(peer = %peer.name, %error, "federation replay fetch failed");
                    continue;
                }
            };
            let items: Vec<Value> = match response.json().await {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(peer = %peer.name, %error, "malformed federation replay response");
                    continue;
                }
            };
            for item in items {
                match self.ingest_remote_event(item, &peer.name) {
                    Ok(_) => accepted += 1,
                    Err(error) => {
                        tracing::warn!(peer = %peer.name, %error, "skipping invalid replay item");
                    }
                }
            }
        }
        Ok(accepted)
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &PulseBus {
        &self.bus
    }
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
