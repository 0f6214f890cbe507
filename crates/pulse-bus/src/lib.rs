// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The pulse bus: the single broker every daemon publishes into and
//! subscribes from. Normalizes, signs, persists, and fans events out to
//! priority-filtered subscribers.

mod bus;
mod error;
mod subscriber;

pub use bus::PulseBus;
pub use error::BusError;
pub use subscriber::Subscription;
