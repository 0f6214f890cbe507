// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signature envelope: canonical serialization plus Ed25519 sign/verify over
//! it. The only correctness-critical module in the workspace.

use crate::error::PulseError;
use crate::event::{canonical_bytes, PulseEvent};
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

fn base64_engine() -> base64::engine::general_purpose::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Read exactly 32 raw bytes from `path`. Shared by the local signing/verify
/// key loader here and by `pulse-federation`'s peer key registry, since both
/// keys on disk are the same raw Ed25519 format.
pub fn load_raw_key(path: &Path) -> Result<[u8; 32], PulseError> {
    let bytes = std::fs::read(path).map_err(|e| {
        PulseError::configuration_missing(format!("cannot read key at {}: {e}", path.display()))
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        PulseError::configuration_missing(format!(
            "key at {} must be exactly 32 raw bytes, got {}",
            path.display(),
            bytes.len()
        ))
    })
}

/// Loads and caches the local signing/verify keypair, lazily on first use.
/// Peer verify keys are owned by the federation link, not by this type.
pub struct SignatureManager {
    signing_key_path: PathBuf,
    verify_key_path: PathBuf,
    signing_key: Mutex<Option<SigningKey>>,
    local_verify_key: Mutex<Option<VerifyingKey>>,
}

impl SignatureManager {
    pub fn new(signing_key_path: impl Into<PathBuf>, verify_key_path: impl Into<PathBuf>) -> Self {
        Self {
            signing_key_path: signing_key_path.into(),
            verify_key_path: verify_key_path.into(),
            signing_key: Mutex::new(None),
            local_verify_key: Mutex::new(None),
        }
    }

    fn signing_key(&self) -> Result<SigningKey, PulseError> {
        let mut guard = self.signing_key.lock();
        if let Some(key) = guard.as_ref() {
            return Ok(key.clone());
        }
        let raw = load_raw_key(&self.signing_key_path)?;
        let key = SigningKey::from_bytes(&raw);
        *guard = Some(key.clone());
        Ok(key)
    }

    /// The local verify key, used when `source_peer` is absent or `"local"`.
    pub fn local_verify_key(&self) -> Result<VerifyingKey, PulseError> {
        let mut guard = self.local_verify_key.lock();
        if let Some(key) = guard.as_ref() {
            return Ok(*key);
        }
        let raw = load_raw_key(&self.verify_key_path)?;
        let key = VerifyingKey::from_bytes(&raw)
            .map_err(|e| PulseError::configuration_missing(format!("invalid verify key: {e}")))?;
        *guard = Some(key);
        Ok(key)
    }

    /// Sign the event's canonical bytes with the local signing key. Fails
    /// hard with `ConfigurationMissing` if the key is absent — this is fatal
    /// to the publish call that triggered it.
    pub fn sign(&self, event: &PulseEvent) -> Result<String, PulseError> {
        self.sign_bytes(&canonical_bytes(event))
    }

    /// Sign arbitrary canonical bytes with the local signing key, used by
    /// other signed records (`MetricsSnapshot`, `ImmutableManifest`) that
    /// build their own canonical encoding via [`crate::event::canonical_value_bytes`].
    pub fn sign_bytes(&self, bytes: &[u8]) -> Result<String, PulseError> {
        let key = self.signing_key()?;
        let signature = key.sign(bytes);
        Ok(base64_engine().encode(signature.to_bytes()))
    }

    /// Verify `event`'s signature against the supplied verify key. Returns
    /// `false` rather than erroring for any malformed or mismatched
    /// signature — downstream rejection is the caller's job.
    pub fn verify_with_key(event: &PulseEvent, verify_key: &VerifyingKey) -> bool {
        let Some(sig_b64) = event.signature.as_deref() else {
            return false;
        };
        Self::verify_bytes_with_key(&canonical_bytes(event), sig_b64, verify_key)
    }

    /// Verify arbitrary canonical bytes against a base64 signature and key.
    pub fn verify_bytes_with_key(bytes: &[u8], sig_b64: &str, verify_key: &VerifyingKey) -> bool {
        let Ok(sig_bytes) = base64_engine().decode(sig_b64) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig_bytes.try_into() else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        verify_key.verify(bytes, &signature).is_ok()
    }

    /// Verify against the local key, used for events whose `source_peer` is
    /// absent or `"local"`.
    pub fn verify_local(&self, event: &PulseEvent) -> bool {
        match self.local_verify_key() {
            Ok(key) => Self::verify_with_key(event, &key),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
