// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Federation configuration: `{enabled, peers: [{name, endpoint}]}` plus the
//! outbound privilege denylist, kept as data on [`FederationConfig`] (rather
//! than a hardcoded constant) so operators can widen it.

use crate::error::FederationError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct PeerSpec {
    pub name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub peers: Vec<PeerSpec>,
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

fn default_denylist() -> Vec<String> {
    vec!["/vow".to_string(), "newlegacy".to_string(), "privileged".to_string()]
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self { enabled: false, peers: Vec::new(), denylist: default_denylist() }
    }
}

impl FederationConfig {
    pub fn load(path: &Path) -> Result<Self, FederationError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.toml");
        std::fs::write(
            &path,
            r#"
            enabled = true
            [[peers]]
            name = "peer-alpha"
            endpoint = "https://alpha.example:8443"
            "#,
        )
        .unwrap();
        let config = FederationConfig::load(&path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].name, "peer-alpha");
        assert_eq!(config.denylist, default_denylist());
    }

    #[test]
    fn default_is_disabled_with_no_peers() {
        let config = FederationConfig::default();
        assert!(!config.enabled);
        assert!(config.peers.is_empty());
    }
}
