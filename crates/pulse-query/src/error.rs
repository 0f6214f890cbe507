// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_core::PulseError;
use pulse_history::HistoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid window expression: {0}")]
    InvalidWindow(String),

    #[error("unknown filter key: {0}")]
    UnknownFilter(String),

    #[error("no snapshot carries window '{0}'")]
    WindowUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Pulse(#[from] PulseError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
