// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared across the workspace: a generated Ed25519 keypair
//! written to disk in the raw 32-byte format the signature envelope expects.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};

pub struct TestKeypair {
    pub signing_key_path: PathBuf,
    pub verify_key_path: PathBuf,
}

impl TestKeypair {
    /// Generate a fresh keypair and write both halves under `dir`.
    pub fn generate(dir: &Path) -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verify_key = signing_key.verifying_key();

        let signing_key_path = dir.join("ed25519_private.key");
        let verify_key_path = dir.join("ed25519_public.key");
        std::fs::write(&signing_key_path, signing_key.to_bytes()).expect("write signing key");
        std::fs::write(&verify_key_path, verify_key.to_bytes()).expect("write verify key");

        Self {
            signing_key_path,
            verify_key_path,
        }
    }
}
