// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external code-generator contract. Mirrors the teacher's
//! `AgentAdapter` pattern: the concrete subprocess invocation lives outside
//! this crate entirely, so tests can supply an in-memory fake.

use crate::error::CodexError;

/// Produces a unified diff (or a JSON `{path: contents}` mapping, for
/// `expand` mode) from a prompt. Implementations own whatever external
/// process or HTTP call actually performs the generation.
pub trait PatchGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, CodexError>;
}

/// Applies a previously generated diff to the working tree. Out of scope
/// here (the contract only); the concrete implementation lives with the
/// caller that owns a checkout to apply into.
pub trait PatchApplier: Send + Sync {
    fn apply_patch(&self, diff: &str) -> Result<bool, CodexError>;
}

/// Runs the verification suite after a patch is applied.
pub trait CiRunner: Send + Sync {
    fn run_ci(&self) -> Result<bool, CodexError>;
}

/// Extract every `+++ b/<path>` target from a unified diff, in order of
/// first appearance, deduplicated.
pub fn parse_files_changed(diff: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut files = Vec::new();
    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("+++ b/") {
            let path = rest.trim();
            if !path.is_empty() && seen.insert(path.to_string()) {
                files.push(path.to_string());
            }
        }
    }
    files
}
