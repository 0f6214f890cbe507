// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signed mapping of repository file paths to SHA-256 digests,
//! reconciled after Codex applies or confirms a patch. Follows the same
//! canonical-bytes-then-sign scheme as `MetricsSnapshot` in `pulse-core`.

use pulse_core::event::canonical_value_bytes;
use pulse_core::{PulseError, SignatureManager};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sha256: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImmutableManifest {
    pub generated: String,
    pub files: BTreeMap<String, ManifestEntry>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl ImmutableManifest {
    pub fn load(path: &Path) -> Result<Self, PulseError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| PulseError::schema_violation(format!("corrupt manifest at {}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PulseError::configuration_missing(format!(
                "cannot read manifest at {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PulseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        canonical_value_bytes(&value, &["signature"])
    }

    pub fn sign(&mut self, signer: &SignatureManager) -> Result<(), PulseError> {
        self.signature = None;
        let bytes = self.canonical_bytes();
        self.signature = Some(signer.sign_bytes(&bytes)?);
        Ok(())
    }
}

/// Recompute the SHA-256 of `path`'s current contents on disk, relative to
/// `root`. Missing files are recorded with a zero digest rather than
/// failing the whole reconciliation — a deleted file is still reconciled
/// out of the manifest by its absence of content, not by erroring.
pub fn digest_file(root: &Path, relative: &str) -> std::io::Result<ManifestEntry> {
    let full = root.join(relative);
    let bytes = std::fs::read(&full)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    Ok(ManifestEntry {
        sha256: hex_encode(&digest),
        size: bytes.len() as u64,
    })
}

#[allow(clippy::expect_used)]
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to a String never fails");
    }
    out
}
