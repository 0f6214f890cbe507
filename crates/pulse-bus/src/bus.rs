// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central broker: normalize, sign, persist, fan out. Grounded in the
//! teacher's daemon-state guarding convention (one coarse `parking_lot::Mutex`
//! around the queue and subscriber list, released before any handler runs).

use crate::error::BusError;
use crate::subscriber::{Subscriber, Subscription};
use parking_lot::Mutex;
use pulse_core::{Priority, PulseError, PulseEvent, SignatureManager};
use pulse_history::HistoryStore;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub(crate) struct State {
    pub(crate) queue: VecDeque<PulseEvent>,
    pub(crate) subscribers: Vec<Subscriber>,
    next_id: u64,
}

type PeerVerifier = dyn Fn(&PulseEvent) -> bool + Send + Sync;

/// The pulse bus. Cheap to clone: internal state is reference-counted, so a
/// single instance can be shared across daemons instead of reached for as a
/// process-wide global.
#[derive(Clone)]
pub struct PulseBus {
    state: Arc<Mutex<State>>,
    history: Arc<HistoryStore>,
    signer: Arc<SignatureManager>,
    peer_verifier: Arc<Mutex<Option<Arc<PeerVerifier>>>>,
}

impl PulseBus {
    pub fn new(history: HistoryStore, signer: SignatureManager) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                queue: VecDeque::new(),
                subscribers: Vec::new(),
                next_id: 0,
            })),
            history: Arc::new(history),
            signer: Arc::new(signer),
            peer_verifier: Arc::new(Mutex::new(None)),
        }
    }

    /// Install the peer-aware verifier consulted by [`PulseBus::verify`] and
    /// [`PulseBus::ingest`] for events whose `source_peer` is not `"local"`.
    /// Left unset, non-local events never verify; `pulse-federation` installs
    /// this at startup once it has loaded the peer key registry, keeping the
    /// bus free of a dependency on the federation crate.
    pub fn set_peer_verifier<F>(&self, verifier: F)
    where
        F: Fn(&PulseEvent) -> bool + Send + Sync + 'static,
    {
        *self.peer_verifier.lock() = Some(Arc::new(verifier));
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Verify an event's signature against the key appropriate for its
    /// `source_peer`: the local key for `"local"`, the installed peer
    /// verifier otherwise.
    pub fn verify(&self, event: &PulseEvent) -> bool {
        if event.source_peer == "local" {
            self.signer.verify_local(event)
        } else {
            match self.peer_verifier.lock().as_ref() {
                Some(f) => f(event),
                None => false,
            }
        }
    }

    fn enqueue_and_fan_out(&self, event: PulseEvent) {
        let priority = event.priority();
        let handlers: Vec<Arc<dyn Fn(&PulseEvent) + Send + Sync>> = {
            let mut guard = self.state.lock();
            guard.queue.push_back(event.clone());
            guard
                .subscribers
                .iter()
                .filter(|s| s.accepts(priority))
                .map(|s| s.handler.clone())
                .collect()
        };
        for handler in handlers {
            handler(&event);
        }
    }

    /// Normalize, sign, persist, and fan out a locally originated event.
    pub fn publish(&self, value: Value) -> Result<PulseEvent, BusError> {
        let mut event = PulseEvent::from_value(value)?;
        event.source_peer = "local".to_string();
        event.signature = None;
        event.signature = Some(self.signer.sign(&event)?);
        self.history.append(&event)?;
        self.enqueue_and_fan_out(event.clone());
        Ok(event)
    }

    /// Accept a pre-signed event from a named remote peer. Verification
    /// happens before persistence: an event that fails verification is never
    /// enqueued or written to history.
    pub fn ingest(&self, value: Value, source_peer: &str) -> Result<PulseEvent, BusError> {
        let mut event = PulseEvent::from_value(value)?;
        let has_signature = event.signature.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        if !has_signature {
            return Err(PulseError::invalid_signature("ingested event has no signature").into());
        }
        event.source_peer = source_peer.to_string();
        if !self.verify(&event) {
            return Err(PulseError::invalid_signature(format!(
                "signature from peer {source_peer} failed verification"
            ))
            .into());
        }
        self.history.append(&event)?;
        self.enqueue_and_fan_out(event.clone());
        Ok(event)
    }

    /// Register a handler, optionally filtered to a set of priorities.
    /// Immediately replays the currently queued events matching the filter
    /// to the new handler, outside the lock.
    pub fn subscribe<F>(&self, handler: F, priorities: Option<HashSet<Priority>>) -> Subscription
    where
        F: Fn(&PulseEvent) + Send + Sync + 'static,
    {
        let handler: Arc<dyn Fn(&PulseEvent) + Send + Sync> = Arc::new(handler);
        let (id, backlog) = {
            let mut guard = self.state.lock();
            let id = guard.next_id;
            guard.next_id += 1;
            guard.subscribers.push(Subscriber {
                id,
                priorities: priorities.clone(),
                handler: handler.clone(),
            });
            let backlog: Vec<PulseEvent> = guard
                .queue
                .iter()
                .filter(|e| match &priorities {
                    None => true,
                    Some(set) => set.contains(&e.priority()),
                })
                .cloned()
                .collect();
            (id, backlog)
        };
        for event in &backlog {
            handler(event);
        }
        Subscription { id, state: self.state.clone() }
    }

    /// Delegates to the history store.
    pub fn replay(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<PulseEvent>, BusError> {
        let bus = self.clone();
        Ok(self.history.replay(since, move |e| bus.verify(e))?)
    }

    /// Snapshot of the in-memory queue, oldest first.
    pub fn pending_events(&self) -> Vec<PulseEvent> {
        self.state.lock().queue.iter().cloned().collect()
    }

    /// Drain up to `count` events from the head of the in-memory queue (all
    /// of them if `count` is `None`).
    pub fn consume_events(&self, count: Option<usize>) -> Vec<PulseEvent> {
        let mut guard = self.state.lock();
        let take = count.unwrap_or(guard.queue.len()).min(guard.queue.len());
        guard.queue.drain(..take).collect()
    }

    /// Clear the queue and subscriber list. Used at process restart and in
    /// tests; never called mid-flight.
    pub fn reset(&self) {
        let mut guard = self.state.lock();
        guard.queue.clear();
        guard.subscribers.clear();
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
