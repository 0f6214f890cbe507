// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ed25519_dalek::VerifyingKey;

/// A named remote node participating in federation, holding its own verify
/// key loaded from `<keys_dir>/<name>.pub`.
#[derive(Clone)]
pub struct Peer {
    pub name: String,
    pub endpoint: String,
    pub verify_key: VerifyingKey,
}

/// Peer names are sanitized to `[A-Za-z0-9_.-]` before ever touching the
/// filesystem or an HTTP path segment.
pub fn sanitize_peer_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
