// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared plumbing between subcommands: loading [`PulseConfig`] from the
//! environment and deriving the paths/keys every command needs, mirroring
//! the teacher's `client_queries.rs` convention of one load path reused by
//! every subcommand rather than each reimplementing it.

use crate::exit_error::ExitError;
use ed25519_dalek::VerifyingKey;
use pulse_core::PulseConfig;
use std::path::PathBuf;

pub fn load_config() -> Result<PulseConfig, ExitError> {
    PulseConfig::from_env().map_err(|error| ExitError::new(1, error.to_string()))
}

pub fn load_verify_key(config: &PulseConfig) -> Result<VerifyingKey, ExitError> {
    let raw = pulse_core::load_raw_key(&config.verify_key_path).map_err(|error| ExitError::new(1, error.to_string()))?;
    VerifyingKey::from_bytes(&raw).map_err(|error| ExitError::new(1, format!("invalid verify key: {error}")))
}

/// `MONITORING_GLOW_ROOT/metrics.jsonl`, the file `MonitoringDaemon`
/// persists signed snapshots to.
pub fn metrics_path(config: &PulseConfig) -> PathBuf {
    config.monitoring_root.join("metrics.jsonl")
}
