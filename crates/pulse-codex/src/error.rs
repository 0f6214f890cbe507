// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pulse_bus::BusError;
use pulse_core::{PulseError, VeilTransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodexError {
    #[error("patch {0} has no veil sidecar on record")]
    UnknownPatch(String),

    #[error("veil transition rejected: {0}")]
    VeilTransition(#[from] VeilTransitionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pulse(#[from] PulseError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

impl CodexError {
    pub fn empty_generation() -> Self {
        PulseError::external_failure("code generator produced empty output").into()
    }

    pub fn apply_failed(patch_id: &str) -> Self {
        PulseError::external_failure(format!("apply_patch failed for {patch_id}")).into()
    }

    pub fn ci_failed(patch_id: &str) -> Self {
        PulseError::external_failure(format!("run_ci failed for {patch_id}")).into()
    }

    pub fn conflict(patch_id: &str, status: &str) -> Self {
        PulseError::operation_conflict(format!("patch {patch_id} is {status}, not suggested/pending")).into()
    }
}
