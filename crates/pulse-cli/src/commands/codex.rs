// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use crate::process::{SubprocessApplier, SubprocessCi, SubprocessGenerator};
use crate::support::load_config;
use clap::Args;
use pulse_bus::PulseBus;
use pulse_codex::{CodexConfig, CodexDaemon};
use pulse_core::SignatureManager;
use pulse_history::HistoryStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct PatchArgs {
    pub patch_id: String,
}

fn env_command(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn build_daemon() -> Result<Arc<CodexDaemon>, ExitError> {
    let pulse_config = load_config()?;
    let signer = Arc::new(SignatureManager::new(
        pulse_config.signing_key_path.clone(),
        pulse_config.verify_key_path.clone(),
    ));
    let history = HistoryStore::new(pulse_config.history_root.clone());
    let bus_signer = SignatureManager::new(pulse_config.signing_key_path.clone(), pulse_config.verify_key_path.clone());
    let bus = PulseBus::new(history, bus_signer);

    let manifest_path = std::env::var("MANIFEST_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| pulse_config.monitoring_root.join("immutable_manifest.json"));
    let repo_root = std::env::var("PULSE_REPO_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
    let codex_config = CodexConfig::from_pulse_config(&pulse_config, manifest_path, repo_root);

    let generator = Arc::new(SubprocessGenerator::new(env_command("CODEX_GENERATOR_CMD", "false")));
    let applier = Arc::new(SubprocessApplier::new(env_command("CODEX_APPLY_CMD", "git apply")));
    let ci = Arc::new(SubprocessCi::new(env_command("CODEX_CI_CMD", "true")));

    Ok(CodexDaemon::configure(bus, codex_config, signer, generator, applier, ci))
}

pub fn confirm(args: PatchArgs) -> Result<(), ExitError> {
    let daemon = build_daemon()?;
    let result = daemon.confirm_veil_patch(&args.patch_id);
    daemon.stop();
    let metadata = result.map_err(|error| ExitError::new(1, error.to_string()))?;
    println!("{} {} -> confirmed", crate::color::header("patch"), crate::color::literal(&metadata.patch_id));
    Ok(())
}

pub fn reject(args: PatchArgs) -> Result<(), ExitError> {
    let daemon = build_daemon()?;
    let result = daemon.reject_veil_patch(&args.patch_id);
    daemon.stop();
    let metadata = result.map_err(|error| ExitError::new(1, error.to_string()))?;
    println!("{} {} -> rejected", crate::color::header("patch"), crate::color::literal(&metadata.patch_id));
    Ok(())
}
