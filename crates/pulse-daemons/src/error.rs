// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_bus::BusError;
use pulse_core::PulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonManagerError {
    #[error("daemon '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("daemon '{0}' is not registered")]
    Unknown(String),

    #[error("{0}")]
    Start(String),

    #[error("{0}")]
    Stop(String),

    #[error(transparent)]
    Pulse(#[from] PulseError),

    #[error(transparent)]
    Bus(#[from] BusError),
}
