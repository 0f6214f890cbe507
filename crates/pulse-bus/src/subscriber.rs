// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::bus::State;
use parking_lot::Mutex;
use pulse_core::{Priority, PulseEvent};
use std::collections::HashSet;
use std::sync::Arc;

pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) priorities: Option<HashSet<Priority>>,
    pub(crate) handler: Arc<dyn Fn(&PulseEvent) + Send + Sync>,
}

impl Subscriber {
    pub(crate) fn accepts(&self, priority: Priority) -> bool {
        match &self.priorities {
            None => true,
            Some(set) => set.contains(&priority),
        }
    }
}

/// Handle returned by [`crate::PulseBus::subscribe`]. Dropping it leaves the
/// subscription active; call [`Subscription::unsubscribe`] to detach.
pub struct Subscription {
    pub(crate) id: u64,
    pub(crate) state: Arc<Mutex<State>>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.state.lock().subscribers.retain(|s| s.id != self.id);
    }
}
