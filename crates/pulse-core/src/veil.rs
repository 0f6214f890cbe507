// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consolidated veil status machine: one type with
//! explicit allowed transitions, shared by the CLI and the Codex alert
//! handler rather than spread across both as ad hoc status strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a candidate patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VeilStatus {
    Suggested,
    Pending,
    Confirmed,
    Rejected,
    Applied,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot transition veil status from {from:?} to {to:?}")]
pub struct VeilTransitionError {
    pub from: VeilStatus,
    pub to: VeilStatus,
}

impl VeilStatus {
    /// Apply the allowed transition graph:
    /// `suggested -> pending -> {confirmed, rejected}` or
    /// `suggested -> {applied, failed}`. Never a reverse transition.
    pub fn transition(self, to: VeilStatus) -> Result<VeilStatus, VeilTransitionError> {
        use VeilStatus::*;
        let allowed = matches!(
            (self, to),
            (Suggested, Pending)
                | (Suggested, Confirmed)
                | (Suggested, Rejected)
                | (Suggested, Applied)
                | (Suggested, Failed)
                | (Pending, Confirmed)
                | (Pending, Rejected)
        );
        if allowed {
            Ok(to)
        } else {
            Err(VeilTransitionError { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            VeilStatus::Confirmed | VeilStatus::Rejected | VeilStatus::Applied | VeilStatus::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_can_move_to_pending() {
        assert_eq!(VeilStatus::Suggested.transition(VeilStatus::Pending), Ok(VeilStatus::Pending));
    }

    #[test]
    fn pending_can_be_confirmed_or_rejected() {
        assert!(VeilStatus::Pending.transition(VeilStatus::Confirmed).is_ok());
        assert!(VeilStatus::Pending.transition(VeilStatus::Rejected).is_ok());
    }

    #[test]
    fn suggested_can_go_directly_to_applied_or_failed() {
        assert!(VeilStatus::Suggested.transition(VeilStatus::Applied).is_ok());
        assert!(VeilStatus::Suggested.transition(VeilStatus::Failed).is_ok());
    }

    #[test]
    fn reverse_transitions_are_rejected() {
        assert!(VeilStatus::Confirmed.transition(VeilStatus::Pending).is_err());
        assert!(VeilStatus::Pending.transition(VeilStatus::Suggested).is_err());
    }

    #[test]
    fn terminal_statuses_accept_no_further_transition() {
        for terminal in [VeilStatus::Confirmed, VeilStatus::Rejected, VeilStatus::Applied, VeilStatus::Failed] {
            assert!(terminal.transition(VeilStatus::Pending).is_err());
        }
    }
}
