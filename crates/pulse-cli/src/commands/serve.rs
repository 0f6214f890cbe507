// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived supervisor process: builds the bus, optional federation link,
//! the daemon manager, monitoring, integrity and Codex daemons, and mounts
//! the optional query/federation HTTP surfaces — the daemon-mode binary
//! referenced throughout the design notes as the home for axum/reqwest,
//! kept entirely out of the library crates.

use crate::exit_error::ExitError;
use crate::process::{SubprocessApplier, SubprocessCi, SubprocessGenerator};
use crate::support::{load_config, metrics_path};
use pulse_bus::PulseBus;
use pulse_codex::{CodexConfig, CodexDaemon};
use pulse_core::SignatureManager;
use pulse_daemons::{DaemonManager, IntegrityDaemon, MonitoringConfig, MonitoringDaemon};
use pulse_federation::{FederationConfig, FederationLink};
use pulse_history::HistoryStore;
use pulse_query::QueryService;
use std::path::PathBuf;
use std::sync::Arc;

fn env_command(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

pub async fn run() -> Result<(), ExitError> {
    let config = load_config()?;

    let signer = Arc::new(SignatureManager::new(config.signing_key_path.clone(), config.verify_key_path.clone()));
    let history = HistoryStore::new(config.history_root.clone());
    let bus_signer = SignatureManager::new(config.signing_key_path.clone(), config.verify_key_path.clone());
    let bus = PulseBus::new(history, bus_signer);

    let federation_config_path = std::env::var("PULSE_FEDERATION_CONFIG").map(PathBuf::from).ok();
    let federation = match federation_config_path {
        Some(path) if path.exists() => {
            let fed_config = FederationConfig::load(&path).map_err(|error| ExitError::new(1, error.to_string()))?;
            Some(
                FederationLink::configure(bus.clone(), fed_config, &config.federation_keys_dir)
                    .map_err(|error| ExitError::new(1, error.to_string()))?,
            )
        }
        _ => None,
    };

    let _manager = DaemonManager::configure(bus.clone(), config.daemon_manager_ledger_path.clone(), federation.clone());
    let _integrity = IntegrityDaemon::configure(bus.clone());

    let verify_key = signer.local_verify_key().map_err(|error| ExitError::new(1, error.to_string()))?;
    let query_service = Arc::new(QueryService::new(
        config.history_root.clone(),
        metrics_path(&config),
        config.codex_ledger_path.clone(),
        verify_key,
    ));
    let monitoring_config = MonitoringConfig {
        metrics_path: metrics_path(&config),
        alerts_ledger_path: config.monitoring_root.join("alerts.jsonl"),
        audit_log_path: config.log_dir.join("monitoring_alerts.jsonl"),
        ..MonitoringConfig::default()
    };
    let _monitoring =
        MonitoringDaemon::configure(bus.clone(), monitoring_config, Arc::new(SignatureManager::new(
            config.signing_key_path.clone(),
            config.verify_key_path.clone(),
        )), query_service.clone());

    let manifest_path = std::env::var("MANIFEST_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config.monitoring_root.join("immutable_manifest.json"));
    let repo_root = std::env::var("PULSE_REPO_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
    let codex_config = CodexConfig::from_pulse_config(&config, manifest_path, repo_root);
    let generator = Arc::new(SubprocessGenerator::new(env_command("CODEX_GENERATOR_CMD", "false")));
    let applier = Arc::new(SubprocessApplier::new(env_command("CODEX_APPLY_CMD", "git apply")));
    let ci = Arc::new(SubprocessCi::new(env_command("CODEX_CI_CMD", "true")));
    let _codex = CodexDaemon::configure(bus.clone(), codex_config, signer, generator, applier, ci);

    let query_enabled = std::env::var("QUERY_HTTP_ENABLED").map(|v| v == "1").unwrap_or(false);
    let mut router = pulse_daemons::router(query_service, query_enabled);
    if let Some(link) = federation {
        router = router.merge(pulse_federation::router(link));
    }

    let bind_addr = env_command("PULSE_BIND_ADDR", "127.0.0.1:8090");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|error| ExitError::new(1, format!("failed to bind {bind_addr}: {error}")))?;
    tracing::info!(%bind_addr, "pulse supervisor listening");
    axum::serve(listener, router).await.map_err(|error| ExitError::new(1, error.to_string()))
}
