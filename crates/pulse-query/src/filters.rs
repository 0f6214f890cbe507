// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::QueryError;
use pulse_core::{Priority, PulseEvent};
use serde::Serialize;
use std::collections::BTreeMap;

/// The closed set of filter keys `query_events`/`query_metrics` accept.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventFilters {
    pub priority: Option<Priority>,
    pub source_daemon: Option<String>,
    pub event_type: Option<String>,
}

impl EventFilters {
    /// Build from a raw key/value map (e.g. HTTP query params or CLI flags),
    /// rejecting any key outside `{priority, source_daemon, event_type}`.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, QueryError> {
        let mut filters = EventFilters::default();
        for (key, value) in raw {
            match key.as_str() {
                "priority" => {
                    filters.priority = Some(
                        Priority::parse(value)
                            .ok_or_else(|| QueryError::InvalidWindow(value.clone()))?,
                    )
                }
                "source_daemon" => filters.source_daemon = Some(value.clone()),
                "event_type" => filters.event_type = Some(value.clone()),
                other => return Err(QueryError::UnknownFilter(other.to_string())),
            }
        }
        Ok(filters)
    }

    pub fn matches(&self, event: &PulseEvent) -> bool {
        if let Some(priority) = self.priority {
            if event.priority() != priority {
                return false;
            }
        }
        if let Some(source_daemon) = &self.source_daemon {
            if &event.source_daemon != source_daemon {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if &event.event_type != event_type {
                return false;
            }
        }
        true
    }
}
