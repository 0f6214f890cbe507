// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::PeerSpec;
use crate::error::FederationError;
use crate::peer::{sanitize_peer_name, Peer};
use ed25519_dalek::VerifyingKey;
use std::collections::HashMap;
use std::path::Path;

pub struct PeerRegistry {
    peers: HashMap<String, Peer>,
}

impl PeerRegistry {
    /// Load one verify key per configured peer from `<keys_dir>/<name>.pub`.
    /// Fails the whole load if any peer name is invalid or any key file is
    /// missing/malformed — a federation link with a partially loaded peer
    /// set is a configuration bug, not a degraded-but-running state.
    pub fn load(keys_dir: &Path, specs: &[PeerSpec]) -> Result<Self, FederationError> {
        let mut peers = HashMap::new();
        for spec in specs {
            if !sanitize_peer_name(&spec.name) {
                return Err(FederationError::InvalidPeerName(spec.name.clone()));
            }
            let key_path = keys_dir.join(format!("{}.pub", spec.name));
            let raw = pulse_core::load_raw_key(&key_path)?;
            let verify_key = VerifyingKey::from_bytes(&raw)
                .map_err(|e| pulse_core::PulseError::configuration_missing(format!("invalid peer key: {e}")))?;
            peers.insert(
                spec.name.clone(),
                Peer { name: spec.name.clone(), endpoint: spec.endpoint.clone(), verify_key },
            );
        }
        Ok(Self { peers })
    }

    pub fn get(&self, name: &str) -> Option<&Peer> {
        self.peers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::test_support::TestKeypair;

    #[test]
    fn loads_registered_peer_key() {
        let dir = tempfile::tempdir().unwrap();
        let keys = TestKeypair::generate(dir.path());
        std::fs::copy(&keys.verify_key_path, dir.path().join("peer-alpha.pub")).unwrap();

        let specs = vec![PeerSpec { name: "peer-alpha".into(), endpoint: "https://alpha".into() }];
        let registry = PeerRegistry::load(dir.path(), &specs).unwrap();
        assert!(registry.get("peer-alpha").is_some());
        assert!(registry.get("peer-beta").is_none());
    }

    #[test]
    fn rejects_invalid_peer_name() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![PeerSpec { name: "../evil".into(), endpoint: "https://evil".into() }];
        let err = PeerRegistry::load(dir.path(), &specs);
        assert!(matches!(err, Err(FederationError::InvalidPeerName(_))));
    }
}
