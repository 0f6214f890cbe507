// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Predictive repair: turns `monitor_alert` pulses and incoming
//! `predictive_suggestion` pulses into candidate patches, gates them through
//! the veil flow, and reconciles the immutable manifest after a patch lands.
//! Subscribed the same way `IntegrityDaemon`/`MonitoringDaemon` are — build
//! an `Arc<Self>`, clone it into the bus subscription closure.

use crate::config::CodexConfig;
use crate::error::CodexError;
use crate::generator::{parse_files_changed, CiRunner, PatchApplier, PatchGenerator};
use crate::manifest::{digest_file, ImmutableManifest};
use crate::patch_id::{allocate_patch_id, allocate_peer_filename};
use chrono::Utc;
use parking_lot::Mutex;
use pulse_bus::{PulseBus, Subscription};
use pulse_core::{
    contains_denylisted_token, is_unsafe_path, CodexMode, Ledger, PatchMetadata, PatchScope, Priority,
    PulseEvent, SignatureManager, VeilStatus,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_CRITICAL_WINDOW_ENTRIES: usize = 256;

#[derive(Clone)]
enum Scope {
    Local,
    Federated(String),
}

fn load_ethics() -> &'static str {
    "Preserve existing invariants. Prefer the smallest diff that resolves the anomaly. \
     Never touch a protected path or weaken a safety check to make a symptom disappear."
}

fn sanitize_peer_token(peer: &str) -> String {
    peer.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn normalize_window(window_seconds: Option<u64>, supplied: Option<&str>) -> String {
    if let Some(seconds) = window_seconds {
        if seconds % 60 == 0 {
            return format!("{}m", seconds / 60);
        }
        return format!("{seconds}s");
    }
    supplied.map(str::to_string).unwrap_or_else(|| "unknown".to_string())
}

pub struct CodexDaemon {
    bus: PulseBus,
    signer: Arc<SignatureManager>,
    config: CodexConfig,
    ledger: Ledger,
    generator: Arc<dyn PatchGenerator>,
    applier: Arc<dyn PatchApplier>,
    ci: Arc<dyn CiRunner>,
    critical_window: Mutex<BTreeMap<String, VecDeque<chrono::DateTime<Utc>>>>,
    repeated_firing: Mutex<BTreeMap<String, bool>>,
    subscription: Mutex<Option<Subscription>>,
}

impl CodexDaemon {
    fn new(
        bus: PulseBus,
        config: CodexConfig,
        signer: Arc<SignatureManager>,
        generator: Arc<dyn PatchGenerator>,
        applier: Arc<dyn PatchApplier>,
        ci: Arc<dyn CiRunner>,
    ) -> Self {
        let ledger = Ledger::new(config.ledger_path.clone());
        Self {
            bus,
            signer,
            config,
            ledger,
            generator,
            applier,
            ci,
            critical_window: Mutex::new(BTreeMap::new()),
            repeated_firing: Mutex::new(BTreeMap::new()),
            subscription: Mutex::new(None),
        }
    }

    pub fn configure(
        bus: PulseBus,
        config: CodexConfig,
        signer: Arc<SignatureManager>,
        generator: Arc<dyn PatchGenerator>,
        applier: Arc<dyn PatchApplier>,
        ci: Arc<dyn CiRunner>,
    ) -> Arc<Self> {
        let daemon = Arc::new(Self::new(bus.clone(), config, signer, generator, applier, ci));
        let handler = daemon.clone();
        let subscription = bus.subscribe(move |event| handler.handle_event(event), None);
        *daemon.subscription.lock() = Some(subscription);
        daemon
    }

    pub fn stop(&self) {
        *self.subscription.lock() = None;
    }

    fn handle_event(&self, event: &PulseEvent) {
        if event.priority() == Priority::Critical {
            self.track_repeated_critical(event);
        }
        if event.event_type == "monitor_alert" && event.priority() == Priority::Critical {
            if let Err(error) = self.handle_alert(event) {
                tracing::warn!(%error, "handle_alert failed");
            }
        } else if event.event_type == "predictive_suggestion" && event.source_peer != "local" {
            if let Err(error) = self.process_predictive_suggestion(event) {
                tracing::warn!(%error, "process_predictive_suggestion failed");
            }
        }
    }

    fn track_repeated_critical(&self, event: &PulseEvent) {
        let source = event.source_daemon.clone();
        let now = Utc::now();
        let cutoff = now - self.config.repeated_critical_window;
        let mut window = self.critical_window.lock();
        let deque = window.entry(source.clone()).or_default();
        while deque.front().map(|t| *t < cutoff).unwrap_or(false) {
            deque.pop_front();
        }
        deque.push_back(now);
        if deque.len() > MAX_CRITICAL_WINDOW_ENTRIES {
            deque.pop_front();
        }
        let count = deque.len() as u32;
        drop(window);

        let mut firing = self.repeated_firing.lock();
        let was_firing = firing.get(&source).copied().unwrap_or(false);
        if count >= self.config.repeated_critical_threshold && !was_firing {
            firing.insert(source.clone(), true);
            drop(firing);
            let value = json!({
                "timestamp": now.to_rfc3339(),
                "source_daemon": "codex",
                "event_type": "restart_request",
                "priority": "critical",
                "payload": {
                    "action": "restart_daemon",
                    "daemon": source,
                    "reason": "codex_detected_repeated_failures",
                },
            });
            if let Err(error) = self.bus.publish(value) {
                tracing::warn!(%error, "failed to publish restart_request pulse");
            }
        } else if count < self.config.repeated_critical_threshold {
            firing.insert(source, false);
        }
    }

    fn append_ledger(&self, entry: Value) {
        if let Err(error) = self.ledger.append(&entry) {
            tracing::warn!(%error, "codex ledger append failed");
        }
    }

    fn publish(&self, event_type: &str, priority: &str, payload: Value) {
        let value = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "source_daemon": "codex",
            "event_type": event_type,
            "priority": priority,
            "payload": payload,
        });
        if let Err(error) = self.bus.publish(value) {
            tracing::warn!(%error, event_type, "failed to publish codex pulse");
        }
    }

    fn requires_confirmation(&self, files_changed: &[String]) -> bool {
        files_changed.iter().any(|file| {
            self.config.confirm_patterns.iter().any(|pattern| file.contains(pattern.as_str()))
                || is_unsafe_path(Path::new(file))
                || file.starts_with("vow/")
        })
    }

    fn sidecar_path(&self, patch_id: &str) -> PathBuf {
        self.config.suggest_dir.join(format!("{patch_id}.veil.json"))
    }

    fn write_diff(&self, filename_stem: &str, diff: &str) -> Result<PathBuf, CodexError> {
        std::fs::create_dir_all(&self.config.suggest_dir)?;
        let path = self.config.suggest_dir.join(format!("{filename_stem}.diff"));
        std::fs::write(&path, diff)?;
        Ok(path)
    }

    fn save_sidecar(&self, metadata: &PatchMetadata) -> Result<(), CodexError> {
        let path = self.sidecar_path(&metadata.patch_id);
        std::fs::create_dir_all(&self.config.suggest_dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(metadata)?)?;
        Ok(())
    }

    fn load_sidecar(&self, patch_id: &str) -> Result<PatchMetadata, CodexError> {
        let raw = std::fs::read_to_string(self.sidecar_path(patch_id))
            .map_err(|_| CodexError::UnknownPatch(patch_id.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Step 3-4-5-6-7 of alert handling: build the prompt, invoke the
    /// generator, allocate an id, persist the diff, extract the changed
    /// files, and decide whether manual confirmation is required. Returns
    /// the four downstream-consumed values so `handle_alert` stays a linear
    /// read of the dispatch branches rather than a second copy of this.
    fn generate_candidate(
        &self,
        target_daemon: &str,
        anomaly_pattern: &str,
        analysis_window: &str,
        originating_peer: &str,
        peer_token: &str,
    ) -> Result<(String, String, PathBuf, Vec<String>, bool), CodexError> {
        let prompt = format!(
            "{}\n\nAnomaly: {anomaly_pattern}\nTarget daemon: {target_daemon}\nAnalysis window: {analysis_window}\nOriginating peer: {originating_peer}\n\nPropose a minimal unified diff that addresses this anomaly.",
            load_ethics()
        );
        let diff = self.generator.generate(&prompt)?;
        if diff.trim().is_empty() {
            return Err(CodexError::empty_generation());
        }
        let patch_id = allocate_patch_id(peer_token, Utc::now());
        let diff_path = self.write_diff(&patch_id, &diff)?;
        let files_changed = parse_files_changed(&diff);
        let requires_confirmation = self.requires_confirmation(&files_changed);
        Ok((patch_id, diff, diff_path, files_changed, requires_confirmation))
    }

    fn handle_alert(&self, event: &PulseEvent) -> Result<(), CodexError> {
        let payload = &event.payload;
        let target_daemon = payload
            .get("target_daemon")
            .and_then(Value::as_str)
            .unwrap_or(&event.source_daemon)
            .to_string();
        let anomaly_pattern = payload
            .get("anomaly_pattern")
            .or_else(|| payload.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(&event.event_type)
            .to_string();
        let analysis_window = normalize_window(
            payload.get("window_seconds").and_then(Value::as_u64),
            payload.get("analysis_window").and_then(Value::as_str),
        );

        let scope = if !event.source_peer.is_empty() && event.source_peer != "local" {
            Scope::Federated(event.source_peer.clone())
        } else {
            Scope::Local
        };
        let (peer_token, target_peer, originating_peer) = match &scope {
            Scope::Local => ("local".to_string(), None, "local".to_string()),
            Scope::Federated(peer) => (sanitize_peer_token(peer), Some(peer.clone()), peer.clone()),
        };

        let (patch_id, diff, diff_path, files_changed, requires_confirmation) = match self
            .generate_candidate(&target_daemon, &anomaly_pattern, &analysis_window, &originating_peer, &peer_token)
        {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "codex generator produced no usable patch, aborting");
                return Ok(());
            }
        };

        let ledger_event = match &scope {
            Scope::Local => "self_predict_suggested",
            Scope::Federated(_) => "federated_predictive_event",
        };
        self.append_ledger(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": ledger_event,
            "status": "suggested",
            "patch_id": patch_id,
            "files_changed": files_changed,
            "analysis_window": analysis_window,
            "anomaly_pattern": anomaly_pattern,
            "scope": match &scope { Scope::Local => "local", Scope::Federated(_) => "federated" },
            "source_peer": event.source_peer,
            "origin_peer": self.config.local_peer_name,
            "target_peer": target_peer,
            "codex_mode": codex_mode_str(self.config.mode),
        }));

        match scope {
            Scope::Local if self.config.mode == CodexMode::Observe => {
                tracing::info!(mode = "observe", patch_id = %patch_id, "patch suggested, not applied in this mode");
            }
            Scope::Local if requires_confirmation => {
                let banner = "# Predictive patch rejected: manual confirmation required\n";
                std::fs::write(&diff_path, format!("{banner}{diff}"))?;
                let metadata = PatchMetadata {
                    patch_id: patch_id.clone(),
                    patch_path: diff_path.display().to_string(),
                    scope: PatchScope::Local,
                    status: VeilStatus::Pending,
                    anomaly_pattern,
                    analysis_window,
                    files_changed,
                    requires_confirmation: true,
                    source_peer: event.source_peer.clone(),
                    target_peer: None,
                    target_daemon,
                    timestamp: Utc::now().to_rfc3339(),
                    codex_mode: codex_mode_str(self.config.mode).to_string(),
                };
                self.save_sidecar(&metadata)?;
                self.publish("veil_request", "warning", serde_json::to_value(&metadata)?);
                self.append_ledger(json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "event": "veil_pending",
                    "patch_id": patch_id,
                }));
            }
            Scope::Local if matches!(self.config.mode, CodexMode::Expand | CodexMode::Repair) => {
                self.apply_locally(&patch_id, &diff, &files_changed);
            }
            Scope::Local => {
                tracing::info!(mode = codex_mode_str(self.config.mode), patch_id = %patch_id, "patch suggested, not applied in this mode");
            }
            Scope::Federated(_) => {
                self.publish(
                    "predictive_suggestion",
                    "info",
                    json!({
                        "patch_id": patch_id,
                        "patch_diff": diff,
                        "status": "suggested",
                        "requires_confirmation": requires_confirmation,
                        "triggering_anomaly": anomaly_pattern,
                        "target_peer": target_peer,
                    }),
                );
            }
        }

        Ok(())
    }

    /// Local auto-apply path for `expand` mode and federated auto-apply:
    /// apply, verify, publish the outcome, and reconcile the manifest on
    /// success. Shared so both call sites record identical ledger/pulse
    /// shapes.
    fn apply_locally(&self, patch_id: &str, diff: &str, files_changed: &[String]) {
        match self.apply_and_reconcile(diff, files_changed, "self_predict_applied") {
            Ok(()) => {
                self.publish("predictive_patch", "info", json!({"patch_id": patch_id, "status": "applied"}));
                self.append_ledger(json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "event": "self_predict_applied",
                    "patch_id": patch_id,
                    "files_changed": files_changed,
                }));
            }
            Err(error) => {
                self.publish(
                    "predictive_patch",
                    "warning",
                    json!({"patch_id": patch_id, "status": "failed", "error": error.to_string()}),
                );
                self.append_ledger(json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "event": "self_predict_failed",
                    "patch_id": patch_id,
                    "error": error.to_string(),
                }));
            }
        }
    }

    fn apply_and_reconcile(&self, diff: &str, files_changed: &[String], source_event: &str) -> Result<(), CodexError> {
        if !self.applier.apply_patch(diff)? {
            return Err(CodexError::apply_failed(source_event));
        }
        if !self.ci.run_ci()? {
            return Err(CodexError::ci_failed(source_event));
        }
        self.reconcile_manifest(files_changed, source_event);
        Ok(())
    }

    fn reconcile_manifest(&self, files_changed: &[String], source_event: &str) {
        if !self.config.manifest_auto_update {
            return;
        }
        let mut manifest = match ImmutableManifest::load(&self.config.manifest_path) {
            Ok(manifest) => manifest,
            Err(error) => {
                tracing::warn!(%error, "failed to load immutable manifest, skipping reconciliation");
                return;
            }
        };

        let mut reconciled = Vec::new();
        for file in files_changed {
            if is_unsafe_path(Path::new(file)) {
                continue;
            }
            match digest_file(&self.config.repo_root, file) {
                Ok(entry) => {
                    manifest.files.insert(file.clone(), entry);
                    reconciled.push(file.clone());
                }
                Err(error) => {
                    tracing::warn!(%error, file, "failed to digest file during manifest reconciliation");
                }
            }
        }
        if reconciled.is_empty() {
            return;
        }

        manifest.generated = Utc::now().to_rfc3339();
        if let Err(error) = manifest.sign(&self.signer) {
            tracing::warn!(%error, "failed to sign reconciled manifest");
            return;
        }
        if let Err(error) = manifest.save(&self.config.manifest_path) {
            tracing::warn!(%error, "failed to persist reconciled manifest");
            return;
        }

        self.append_ledger(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "manifest_reconciled",
            "files": reconciled,
            "source_event": source_event,
        }));
        self.publish(
            "manifest_update",
            "info",
            json!({
                "files": reconciled,
                "signature": manifest.signature,
                "manifest_path": self.config.manifest_path.display().to_string(),
                "source_event": source_event,
            }),
        );
    }

    fn process_predictive_suggestion(&self, event: &PulseEvent) -> Result<(), CodexError> {
        let payload = &event.payload;
        if let Some(target_peer) = payload.get("target_peer").and_then(Value::as_str) {
            if !target_peer.is_empty() && target_peer != self.config.local_peer_name {
                return Ok(());
            }
        }
        let Some(diff) = payload.get("patch_diff").and_then(Value::as_str).filter(|d| !d.is_empty()) else {
            return Ok(());
        };

        let filename = allocate_peer_filename(&event.source_peer, Utc::now());
        let diff_path = self.write_diff(&filename, diff)?;
        let files_changed = parse_files_changed(diff);
        let requires_confirmation = self.requires_confirmation(&files_changed);

        self.append_ledger(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "federated_predictive_event",
            "status": "suggested",
            "patch_id": filename,
            "files_changed": files_changed,
            "source_peer": event.source_peer,
        }));

        if contains_denylisted_token(diff) || files_changed.iter().any(|f| is_unsafe_path(Path::new(f))) {
            let _ = std::fs::remove_file(&diff_path);
            self.append_ledger(json!({
                "timestamp": Utc::now().to_rfc3339(),
                "event": "federated_predictive_event",
                "status": "rejected",
                "patch_id": filename,
            }));
            return Ok(());
        }

        if requires_confirmation {
            let metadata = PatchMetadata {
                patch_id: filename.clone(),
                patch_path: diff_path.display().to_string(),
                scope: PatchScope::Federated,
                status: VeilStatus::Pending,
                anomaly_pattern: "federated_suggestion".to_string(),
                analysis_window: "unknown".to_string(),
                files_changed,
                requires_confirmation: true,
                source_peer: event.source_peer.clone(),
                target_peer: None,
                target_daemon: event.source_daemon.clone(),
                timestamp: Utc::now().to_rfc3339(),
                codex_mode: codex_mode_str(self.config.mode).to_string(),
            };
            self.save_sidecar(&metadata)?;
            self.publish("veil_request", "warning", serde_json::to_value(&metadata)?);
            return Ok(());
        }

        if self.config.federated_auto_apply {
            match self.apply_and_reconcile(diff, &files_changed, "self_predict_applied") {
                Ok(()) => {
                    self.publish("predictive_suggestion", "info", json!({"patch_id": filename, "status": "applied"}));
                    self.append_ledger(json!({
                        "timestamp": Utc::now().to_rfc3339(),
                        "event": "self_predict_applied",
                        "patch_id": filename,
                        "files_changed": files_changed,
                    }));
                }
                Err(error) => {
                    self.publish(
                        "predictive_suggestion",
                        "warning",
                        json!({"patch_id": filename, "status": "failed", "error": error.to_string()}),
                    );
                    self.append_ledger(json!({
                        "timestamp": Utc::now().to_rfc3339(),
                        "event": "self_predict_failed",
                        "patch_id": filename,
                        "error": error.to_string(),
                    }));
                }
            }
        }

        Ok(())
    }

    pub fn confirm_veil_patch(&self, patch_id: &str) -> Result<PatchMetadata, CodexError> {
        let mut metadata = self.load_sidecar(patch_id)?;
        if !matches!(metadata.status, VeilStatus::Suggested | VeilStatus::Pending) {
            return Err(CodexError::conflict(patch_id, status_str(metadata.status)));
        }

        let diff = std::fs::read_to_string(&metadata.patch_path)?;

        if !self.applier.apply_patch(&diff)? {
            self.append_ledger(json!({
                "timestamp": Utc::now().to_rfc3339(),
                "event": "patch_apply_failed",
                "patch_id": patch_id,
            }));
            return Err(CodexError::apply_failed(patch_id));
        }
        if !self.ci.run_ci()? {
            self.append_ledger(json!({
                "timestamp": Utc::now().to_rfc3339(),
                "event": "verification_failed",
                "patch_id": patch_id,
            }));
            return Err(CodexError::ci_failed(patch_id));
        }

        metadata.status = metadata.status.transition(VeilStatus::Confirmed)?;
        self.save_sidecar(&metadata)?;
        self.append_ledger(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "veil_confirmed",
            "patch_id": patch_id,
        }));
        self.publish("veil_confirmed", "info", serde_json::to_value(&metadata)?);
        self.reconcile_manifest(&metadata.files_changed, "veil_confirmed");
        Ok(metadata)
    }

    pub fn reject_veil_patch(&self, patch_id: &str) -> Result<PatchMetadata, CodexError> {
        let mut metadata = self.load_sidecar(patch_id)?;
        if !matches!(metadata.status, VeilStatus::Suggested | VeilStatus::Pending) {
            return Err(CodexError::conflict(patch_id, status_str(metadata.status)));
        }

        let _ = std::fs::remove_file(&metadata.patch_path);
        metadata.status = metadata.status.transition(VeilStatus::Rejected)?;
        self.save_sidecar(&metadata)?;
        self.append_ledger(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "veil_rejected",
            "patch_id": patch_id,
        }));
        self.publish("veil_rejected", "info", serde_json::to_value(&metadata)?);
        Ok(metadata)
    }
}

fn codex_mode_str(mode: CodexMode) -> &'static str {
    match mode {
        CodexMode::Observe => "observe",
        CodexMode::Repair => "repair",
        CodexMode::Expand => "expand",
    }
}

fn status_str(status: VeilStatus) -> &'static str {
    match status {
        VeilStatus::Suggested => "suggested",
        VeilStatus::Pending => "pending",
        VeilStatus::Confirmed => "confirmed",
        VeilStatus::Rejected => "rejected",
        VeilStatus::Applied => "applied",
        VeilStatus::Failed => "failed",
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
