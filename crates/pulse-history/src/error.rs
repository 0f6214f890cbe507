// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_core::PulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history append failed: {0}")]
    Append(#[from] std::io::Error),

    #[error(transparent)]
    Pulse(#[from] PulseError),
}
