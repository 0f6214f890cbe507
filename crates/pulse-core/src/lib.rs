// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pulse-core: shared types for the signed pulse bus and its supervisory
//! daemons — the event model, canonical signing envelope, configuration,
//! error taxonomy, clock abstraction, veil status machine, and the
//! append-only ledger writer every other crate in the workspace builds on.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod metrics;
pub mod patch;
pub mod safety;
pub mod signature;
pub mod veil;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{CodexMode, ConfigError, PulseConfig};
pub use error::PulseError;
pub use event::{canonical_bytes, PulseEvent, Priority};
pub use ledger::Ledger;
pub use metrics::{
    AnomalyBreach, AnomalyThreshold, MetricsSnapshot, OverallCounts, PriorityCounts, WindowSummary,
};
pub use patch::{PatchMetadata, PatchScope};
pub use safety::{contains_denylisted_token, is_unsafe_path};
pub use signature::{load_raw_key, SignatureManager};
pub use veil::{VeilStatus, VeilTransitionError};
