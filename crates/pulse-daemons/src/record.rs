// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::handle::{DaemonHandle, StartFn, StopFn};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub last_restart: Option<String>,
    pub last_reason: Option<String>,
    pub last_outcome: Option<String>,
    pub last_error: Option<String>,
}

pub(crate) struct DaemonRecord {
    pub(crate) start_fn: StartFn,
    pub(crate) stop_fn: StopFn,
    pub(crate) instance: Option<Box<dyn DaemonHandle>>,
    pub(crate) status: DaemonStatus,
}
