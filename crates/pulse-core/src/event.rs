// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pulse event: the sole wire and storage unit for everything that
//! flows through the bus.

use crate::error::PulseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Routing priority. Default is [`Priority::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Info,
    Warning,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "info",
            Priority::Warning => "warning",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Some(Priority::Info),
            "warning" => Some(Priority::Warning),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

/// One signed event flowing through the bus.
///
/// Construction always goes through [`PulseEvent::from_value`] /
/// [`apply_defaults`] so that every caller, local or remote, observes the
/// same idempotent default-filling the bus itself applies at `publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseEvent {
    pub timestamp: String,
    pub source_daemon: String,
    pub event_type: String,
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default = "default_internal_priority")]
    pub internal_priority: Value,
    #[serde(default = "default_event_origin")]
    pub event_origin: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_source_peer")]
    pub source_peer: String,
    #[serde(default)]
    pub signature: Option<String>,
}

fn default_internal_priority() -> Value {
    Value::String("baseline".to_string())
}

fn default_event_origin() -> String {
    "local".to_string()
}

fn default_priority() -> String {
    "info".to_string()
}

fn default_source_peer() -> String {
    "local".to_string()
}

impl PulseEvent {
    /// Normalize a raw JSON value into a [`PulseEvent`], applying every
    /// defaulted extension field and validating extended field types.
    /// Idempotent: normalizing an already-normalized event's JSON yields an
    /// equal event.
    pub fn from_value(value: Value) -> Result<Self, PulseError> {
        let Value::Object(mut map) = value else {
            return Err(PulseError::schema_violation("event must be a JSON object"));
        };

        for required in ["timestamp", "source_daemon", "event_type"] {
            match map.get(required) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(PulseError::schema_violation(format!(
                        "field '{required}' must be a string"
                    )))
                }
                None => {
                    return Err(PulseError::schema_violation(format!(
                        "missing required field '{required}'"
                    )))
                }
            }
        }

        let payload = match map.remove("payload") {
            Some(Value::Object(p)) => p,
            Some(_) => return Err(PulseError::schema_violation("'payload' must be a map")),
            None => return Err(PulseError::schema_violation("missing required field 'payload'")),
        };

        let focus = match map.remove("focus") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(PulseError::schema_violation("'focus' must be a nullable string")),
        };

        let context = match map.remove("context") {
            None => Map::new(),
            Some(Value::Object(c)) => c,
            Some(_) => return Err(PulseError::schema_violation("'context' must be a map")),
        };

        let internal_priority = match map.remove("internal_priority") {
            None => default_internal_priority(),
            Some(v @ Value::String(_)) | Some(v @ Value::Number(_)) | Some(v @ Value::Null) => v,
            Some(_) => {
                return Err(PulseError::schema_violation(
                    "'internal_priority' must be a string, number, or null",
                ))
            }
        };

        let event_origin = match map.remove("event_origin") {
            None => default_event_origin(),
            Some(Value::String(s)) => s,
            Some(_) => return Err(PulseError::schema_violation("'event_origin' must be a string")),
        };

        let priority = match map.remove("priority") {
            None => default_priority(),
            Some(Value::String(s)) => {
                let lowered = s.to_ascii_lowercase();
                if Priority::parse(&lowered).is_none() {
                    return Err(PulseError::schema_violation(format!(
                        "priority '{s}' is not one of info|warning|critical"
                    )));
                }
                lowered
            }
            Some(_) => return Err(PulseError::schema_violation("'priority' must be a string")),
        };

        let source_peer = match map.remove("source_peer") {
            None => default_source_peer(),
            Some(Value::String(s)) => s,
            Some(_) => return Err(PulseError::schema_violation("'source_peer' must be a string")),
        };

        let signature = match map.remove("signature") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(PulseError::schema_violation("'signature' must be a string")),
        };

        let timestamp = map.get("timestamp").and_then(Value::as_str).unwrap_or_default().to_string();
        let source_daemon = map.get("source_daemon").and_then(Value::as_str).unwrap_or_default().to_string();
        let event_type = map.get("event_type").and_then(Value::as_str).unwrap_or_default().to_string();

        Ok(PulseEvent {
            timestamp,
            source_daemon,
            event_type,
            payload,
            focus,
            context,
            internal_priority,
            event_origin,
            priority,
            source_peer,
            signature,
        })
    }

    pub fn priority(&self) -> Priority {
        Priority::parse(&self.priority).unwrap_or(Priority::Info)
    }

    /// Serialize to a `serde_json::Value`, the shape used for canonicalization,
    /// storage, and wire transport.
    #[allow(clippy::expect_used)]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("PulseEvent always serializes")
    }
}

/// Deep-sort a JSON value's object keys, recursively, matching the Python
/// reference's `json.dumps(sort_keys=True)` traversal.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// The exact byte string signed and verified over: sorted-key, no-whitespace
/// JSON with `signature` and `source_peer` removed. This is the only
/// correctness-critical encoding in the whole system — any
/// reimplementation must match it byte-for-byte.
pub fn canonical_bytes(event: &PulseEvent) -> Vec<u8> {
    canonical_value_bytes(&event.to_value(), &["signature", "source_peer"])
}

/// General form of [`canonical_bytes`] for other signed records (e.g.
/// `MetricsSnapshot`, `ImmutableManifest`): sorted-key, no-whitespace JSON
/// with the named keys removed before signing.
#[allow(clippy::expect_used)]
pub fn canonical_value_bytes(value: &Value, exclude: &[&str]) -> Vec<u8> {
    let mut value = value.clone();
    if let Value::Object(map) = &mut value {
        for key in exclude {
            map.remove(*key);
        }
    }
    let sorted = sort_keys(&value);
    serde_json::to_vec(&sorted).expect("sorted value always serializes")
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
