// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Duration;
use pulse_core::{CodexMode, PulseConfig};
use std::path::PathBuf;

/// Codex's own view of process configuration: the Codex-relevant fields of
/// [`PulseConfig`] plus the two paths (manifest, repository root) that
/// belong to this crate alone rather than the shared ambient config.
#[derive(Debug, Clone)]
pub struct CodexConfig {
    pub mode: CodexMode,
    pub max_iterations: u32,
    pub confirm_patterns: Vec<String>,
    pub local_peer_name: String,
    pub federated_auto_apply: bool,
    pub manifest_auto_update: bool,
    pub suggest_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub manifest_path: PathBuf,
    pub repo_root: PathBuf,
    /// Window over which repeated critical events from the same source are
    /// counted before Codex requests a restart on its own initiative.
    pub repeated_critical_window: Duration,
    pub repeated_critical_threshold: u32,
}

impl Default for CodexConfig {
    fn default() -> Self {
        let defaults = PulseConfig::default();
        Self {
            mode: defaults.codex_mode,
            max_iterations: defaults.codex_max_iterations,
            confirm_patterns: defaults.codex_confirm_patterns,
            local_peer_name: defaults.local_peer_name,
            federated_auto_apply: defaults.federated_auto_apply,
            manifest_auto_update: defaults.manifest_auto_update,
            suggest_dir: defaults.codex_suggest_dir,
            ledger_path: defaults.codex_ledger_path,
            manifest_path: PathBuf::from("/glow/monitoring/immutable_manifest.json"),
            repo_root: PathBuf::from("."),
            repeated_critical_window: Duration::minutes(5),
            repeated_critical_threshold: 3,
        }
    }
}

impl CodexConfig {
    /// Lift the Codex-relevant fields out of the process-wide
    /// [`PulseConfig`], adding the two paths it doesn't carry.
    pub fn from_pulse_config(config: &PulseConfig, manifest_path: PathBuf, repo_root: PathBuf) -> Self {
        Self {
            mode: config.codex_mode,
            max_iterations: config.codex_max_iterations,
            confirm_patterns: config.codex_confirm_patterns.clone(),
            local_peer_name: config.local_peer_name.clone(),
            federated_auto_apply: config.federated_auto_apply,
            manifest_auto_update: config.manifest_auto_update,
            suggest_dir: config.codex_suggest_dir.clone(),
            ledger_path: config.codex_ledger_path.clone(),
            manifest_path,
            repo_root,
            ..Self::default()
        }
    }
}
