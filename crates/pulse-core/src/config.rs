// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide configuration, assembled once at startup from environment
//! variables with documented defaults, following the teacher daemon's
//! `lifecycle::Config` pattern of an explicit struct rather than scattered
//! `env::var` calls at each use site.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} has an invalid value: {1}")]
    InvalidValue(&'static str, String),
}

/// One of Codex's three operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodexMode {
    Observe,
    Repair,
    Expand,
}

impl FromStr for CodexMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "observe" => Ok(CodexMode::Observe),
            "repair" => Ok(CodexMode::Repair),
            "expand" => Ok(CodexMode::Expand),
            _ => Err(()),
        }
    }
}

impl Default for CodexMode {
    fn default() -> Self {
        CodexMode::Observe
    }
}

#[derive(Debug, Clone)]
pub struct PulseConfig {
    pub history_root: PathBuf,
    pub signing_key_path: PathBuf,
    pub verify_key_path: PathBuf,
    pub federation_keys_dir: PathBuf,
    pub monitoring_root: PathBuf,
    pub log_dir: PathBuf,
    pub codex_ledger_path: PathBuf,
    pub codex_suggest_dir: PathBuf,
    pub daemon_manager_ledger_path: PathBuf,
    pub codex_mode: CodexMode,
    pub codex_max_iterations: u32,
    pub codex_confirm_patterns: Vec<String>,
    pub local_peer_name: String,
    pub federated_auto_apply: bool,
    pub manifest_auto_update: bool,
    pub auto_approve: bool,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            history_root: PathBuf::from("/glow/pulse_history"),
            signing_key_path: PathBuf::from("/vow/keys/ed25519_private.key"),
            verify_key_path: PathBuf::from("/vow/keys/ed25519_public.key"),
            federation_keys_dir: PathBuf::from("/glow/federation_keys"),
            monitoring_root: PathBuf::from("/glow/monitoring"),
            log_dir: PathBuf::from("/glow/logs"),
            codex_ledger_path: PathBuf::from("/daemon/logs/codex.jsonl"),
            codex_suggest_dir: PathBuf::from("/glow/codex_suggestions"),
            daemon_manager_ledger_path: PathBuf::from("/daemon/logs/codex.jsonl"),
            codex_mode: CodexMode::default(),
            codex_max_iterations: 1,
            codex_confirm_patterns: Vec::new(),
            local_peer_name: "local".to_string(),
            federated_auto_apply: false,
            manifest_auto_update: true,
            auto_approve: false,
        }
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(ConfigError::InvalidValue(name, other.to_string())),
        },
    }
}

fn env_path(name: &'static str, default: &PathBuf) -> PathBuf {
    std::env::var(name).map(PathBuf::from).unwrap_or_else(|_| default.clone())
}

fn env_string(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl PulseConfig {
    /// Build configuration from the environment. Never panics on a
    /// missing optional variable; a malformed boolean/number surfaces as a
    /// [`ConfigError`] the CLI can report and exit non-zero on.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let codex_mode = match std::env::var("CODEX_MODE") {
            Err(_) => CodexMode::default(),
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CODEX_MODE", raw))?,
        };

        let codex_max_iterations = match std::env::var("CODEX_MAX_ITERATIONS") {
            Err(_) => defaults.codex_max_iterations,
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CODEX_MAX_ITERATIONS", raw))?,
        };

        let codex_confirm_patterns = std::env::var("CODEX_CONFIRM_PATTERNS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            history_root: env_path("PULSE_HISTORY_ROOT", &defaults.history_root),
            signing_key_path: env_path("PULSE_SIGNING_KEY", &defaults.signing_key_path),
            verify_key_path: env_path("PULSE_VERIFY_KEY", &defaults.verify_key_path),
            federation_keys_dir: env_path("PULSE_FEDERATION_KEYS_DIR", &defaults.federation_keys_dir),
            monitoring_root: env_path("MONITORING_GLOW_ROOT", &defaults.monitoring_root),
            log_dir: env_path("SENTIENTOS_LOG_DIR", &defaults.log_dir),
            codex_ledger_path: env_path("CODEX_LEDGER_PATH", &defaults.codex_ledger_path),
            codex_suggest_dir: env_path("CODEX_SUGGEST_DIR", &defaults.codex_suggest_dir),
            daemon_manager_ledger_path: defaults.daemon_manager_ledger_path,
            codex_mode,
            codex_max_iterations,
            codex_confirm_patterns,
            local_peer_name: env_string("LOCAL_PEER_NAME", &defaults.local_peer_name),
            federated_auto_apply: env_bool("FEDERATED_AUTO_APPLY", defaults.federated_auto_apply)?,
            manifest_auto_update: env_bool("MANIFEST_AUTO_UPDATE", defaults.manifest_auto_update)?,
            auto_approve: env_bool("LUMOS_AUTO_APPROVE", defaults.auto_approve)?,
        })
    }
}
