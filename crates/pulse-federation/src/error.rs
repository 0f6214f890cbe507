// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_bus::BusError;
use pulse_core::PulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("federation is disabled")]
    Disabled,

    #[error("peer '{0}' is not registered")]
    UnknownPeer(String),

    #[error("peer name '{0}' is invalid; expected [A-Za-z0-9_.-]+")]
    InvalidPeerName(String),

    #[error("signature from peer '{0}' failed verification")]
    InvalidSignature(String),

    #[error(transparent)]
    Pulse(#[from] PulseError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("failed to read federation config: {0}")]
    Config(#[from] std::io::Error),

    #[error("failed to parse federation config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("federation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed federation response: {0}")]
    Json(#[from] serde_json::Error),
}
