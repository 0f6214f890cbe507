// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for the pulse bus and its supervisory daemons.
//!
//! Every crate in the workspace wraps [`PulseError`] into its own
//! thiserror-derived error type via `#[from]`, so call sites can match on the
//! behavioral category here while still working with a crate-local error type
//! at their own boundary.

use thiserror::Error;

/// Behavioral error categories shared across the whole pulse system.
#[derive(Debug, Error)]
pub enum PulseError {
    /// A signing or federation key was required but absent on disk.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// An event failed normalization: not a map, a required field missing,
    /// an out-of-range priority, or an extended field with the wrong type.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A signature was absent, malformed, or cryptographically invalid.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A filesystem path resolved into a denylisted segment, or an outbound
    /// payload matched the federation privilege denylist.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A state transition (e.g. veil confirm/reject) was attempted from an
    /// incompatible status.
    #[error("operation conflict: {0}")]
    OperationConflict(String),

    /// An external collaborator (`apply_patch`, `run_ci`, the code generator)
    /// failed or returned an unusable result.
    #[error("external failure: {0}")]
    ExternalFailure(String),

    /// A remote call (federation forwarding or replay fetch) failed; not
    /// retried inline.
    #[error("transient remote failure: {0}")]
    TransientRemote(String),

    /// Underlying I/O failure on a persistence path that must not be
    /// silently swallowed (history append, ledger append).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A `PulseEvent` (or a value read back from storage) could not be
    /// decoded as JSON.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PulseError {
    pub fn configuration_missing(msg: impl Into<String>) -> Self {
        Self::ConfigurationMissing(msg.into())
    }

    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn operation_conflict(msg: impl Into<String>) -> Self {
        Self::OperationConflict(msg.into())
    }

    pub fn external_failure(msg: impl Into<String>) -> Self {
        Self::ExternalFailure(msg.into())
    }

    pub fn transient_remote(msg: impl Into<String>) -> Self {
        Self::TransientRemote(msg.into())
    }
}
