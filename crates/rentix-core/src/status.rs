//! # Reservation State Machine
//!
//! ```text
//!  pending ──► confirmed ──► active ──► completed
//!     │            │           │
//!     └────────────┴───────────┴──────► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Only pending, confirmed and
//! active occupy inventory. Leaving an occupying status releases the units
//! logically: assignments stay for audit but no longer count.

use crate::error::{CoreError, CoreResult};
use crate::types::ReservationStatus;

use ReservationStatus::*;

/// Allowed transitions, one row per source status.
const TRANSITIONS: &[(ReservationStatus, &[ReservationStatus])] = &[
    (Pending, &[Confirmed, Cancelled]),
    (Confirmed, &[Active, Cancelled]),
    (Active, &[Completed, Cancelled]),
    (Completed, &[]),
    (Cancelled, &[]),
];

/// Returns true if reservations in `status` block their units.
#[inline]
pub fn is_occupying(status: ReservationStatus) -> bool {
    matches!(status, Pending | Confirmed | Active)
}

/// Statuses reachable from `from` in one step.
pub fn allowed_transitions(from: ReservationStatus) -> &'static [ReservationStatus] {
    TRANSITIONS
        .iter()
        .find(|(source, _)| *source == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Validates `from -> to` against the table.
///
/// Repeating the current status is not a transition: cancelling a cancelled
/// booking fails, so units are never released twice.
pub fn transition(from: ReservationStatus, to: ReservationStatus) -> CoreResult<ReservationStatus> {
    if allowed_transitions(from).contains(&to) {
        Ok(to)
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

impl ReservationStatus {
    #[inline]
    pub fn is_occupying(self) -> bool {
        is_occupying(self)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    #[inline]
    pub fn can_transition_to(self, to: ReservationStatus) -> bool {
        allowed_transitions(self).contains(&to)
    }
}
