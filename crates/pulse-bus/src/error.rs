// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_core::PulseError;
use pulse_history::HistoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Pulse(#[from] PulseError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
