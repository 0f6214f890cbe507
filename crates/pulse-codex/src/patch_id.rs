// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Patch identifier allocation. No `hex` crate is in the workspace, so the
//! random suffix is generated one nibble at a time via `rand`.

use chrono::{DateTime, Utc};
use rand::Rng;

#[allow(clippy::expect_used)]
fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).expect("0..16 is always a valid hex digit"))
        .collect()
}

/// `predictive_<peer_token>_<YYYYMMDDTHHMMSS>_<6hex>`.
pub fn allocate_patch_id(peer_token: &str, now: DateTime<Utc>) -> String {
    format!(
        "predictive_{peer_token}_{}_{}",
        now.format("%Y%m%dT%H%M%S"),
        random_hex(6)
    )
}

/// `peer_<peer>_<ts>_<4hex>`, used for diffs persisted from an incoming
/// federated suggestion rather than a locally generated one.
pub fn allocate_peer_filename(peer: &str, now: DateTime<Utc>) -> String {
    format!("peer_{peer}_{}_{}", now.format("%Y%m%dT%H%M%S"), random_hex(4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_id_has_expected_shape() {
        let now = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let id = allocate_patch_id("local", now);
        assert!(id.starts_with("predictive_local_20250101T000000_"));
        assert_eq!(id.len(), "predictive_local_20250101T000000_".len() + 6);
    }

    #[test]
    fn peer_filename_has_expected_shape() {
        let now = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let name = allocate_peer_filename("station-b", now);
        assert!(name.starts_with("peer_station-b_20250101T000000_"));
        assert_eq!(name.len(), "peer_station-b_20250101T000000_".len() + 4);
    }
}
