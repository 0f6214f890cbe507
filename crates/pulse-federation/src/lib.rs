// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Federation link: peer registry, outbound forwarding with privilege
//! redaction, inbound verification against per-peer keys, and bounded
//! replay fetch.
//!
//! Replay fetch has no deduplication against already-seen events:
//! `request_recent_events` relies on signature verification plus downstream
//! idempotence. Re-ingesting an event that looks already-persisted still
//! appends another history line, since history is append-only and not
//! keyed for dedup. This is a deliberate simplification, not an oversight.

mod config;
mod error;
mod http;
mod link;
mod peer;
mod registry;

pub use config::{FederationConfig, PeerSpec};
pub use error::FederationError;
pub use http::router;
pub use link::FederationLink;
pub use peer::{sanitize_peer_name, Peer};
pub use registry::PeerRegistry;
