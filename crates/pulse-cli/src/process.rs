// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External-tool bindings for Codex's [`PatchGenerator`]/[`PatchApplier`]/
//! [`CiRunner`] contract. The contract itself is a crate boundary by design
//! (see `pulse-codex`'s own doc comment); this module is where a production
//! binary decides what "generate a patch"/"apply a patch"/"run CI" actually
//! shell out to, the way `atomize-hq-codex-wrapper`'s `exec.rs` wraps its
//! own external tool invocation behind a narrow trait.

use pulse_codex::{CiRunner, CodexError, PatchApplier, PatchGenerator};
use std::io::Write;
use std::process::{Command, Stdio};

/// Runs `command` (via `sh -c`) with `input` piped to stdin, returning
/// stdout as a string. Used for the code generator, whose output is a
/// unified diff on stdout.
pub struct SubprocessGenerator {
    command: String,
}

impl SubprocessGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl PatchGenerator for SubprocessGenerator {
    fn generate(&self, prompt: &str) -> Result<String, CodexError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(prompt.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            tracing::warn!(status = %output.status, "codex generator command exited non-zero");
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs `command` with `diff` piped to stdin; success is a zero exit code.
pub struct SubprocessApplier {
    command: String,
}

impl SubprocessApplier {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl PatchApplier for SubprocessApplier {
    fn apply_patch(&self, diff: &str) -> Result<bool, CodexError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(diff.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            tracing::warn!(status = %output.status, stderr = %String::from_utf8_lossy(&output.stderr), "apply_patch command failed");
        }
        Ok(output.status.success())
    }
}

/// Runs `command` with no stdin; success is a zero exit code.
pub struct SubprocessCi {
    command: String,
}

impl SubprocessCi {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl CiRunner for SubprocessCi {
    fn run_ci(&self) -> Result<bool, CodexError> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .status()?;
        if !status.success() {
            tracing::warn!(%status, "run_ci command failed");
        }
        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_captures_stdout() {
        let generator = SubprocessGenerator::new("cat");
        let out = generator.generate("--- a/x\n+++ b/x\n").unwrap();
        assert_eq!(out, "--- a/x\n+++ b/x\n");
    }

    #[test]
    fn applier_reports_failure_on_nonzero_exit() {
        let applier = SubprocessApplier::new("exit 1");
        assert!(!applier.apply_patch("diff").unwrap());
    }

    #[test]
    fn ci_reports_success_on_zero_exit() {
        let ci = SubprocessCi::new("true");
        assert!(ci.run_ci().unwrap());
    }
}
