// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata for a Codex-generated predictive patch, stored alongside its
//! diff as a `<patch_id>.veil.json` sidecar. Shared by `pulse-codex` (which
//! produces it) and `pulse-cli` (whose `codex confirm`/`codex reject`
//! commands read and rewrite it) to avoid a CLI-to-daemon dependency cycle.

use crate::veil::VeilStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchScope {
    Local,
    Federated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchMetadata {
    pub patch_id: String,
    pub patch_path: String,
    pub scope: PatchScope,
    pub status: VeilStatus,
    pub anomaly_pattern: String,
    pub analysis_window: String,
    pub files_changed: Vec<String>,
    pub requires_confirmation: bool,
    pub source_peer: String,
    #[serde(default)]
    pub target_peer: Option<String>,
    pub target_daemon: String,
    pub timestamp: String,
    pub codex_mode: String,
}
