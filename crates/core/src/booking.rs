//! Booking admission rules.
//!
//! The capacity invariant: for every ride, the sum of seats over all
//! participants whose status is not CANCELLED never exceeds the ride's
//! `available_seats`. Both store implementations apply these functions inside
//! their atomic section (row lock or mutex), so the check and the write are
//! observed as a single unit by concurrent joins.

use crate::error::CoreError;
use crate::status::{ParticipantStatus, StatusId};

/// Sum the seats held by participants that count against capacity.
///
/// Takes `(status_id, seats)` pairs so callers do not need a full entity.
/// Unknown status IDs are counted conservatively (they hold seats).
pub fn seats_taken(participants: &[(StatusId, i32)]) -> i64 {
    participants
        .iter()
        .filter(|(status_id, _)| {
            ParticipantStatus::from_id(*status_id).is_none_or(ParticipantStatus::holds_seats)
        })
        .map(|(_, seats)| i64::from(*seats))
        .sum()
}

/// The capacity check at the heart of `JoinRide`.
///
/// `taken` is the committed non-cancelled seat sum at the time the ride row
/// is held; `requested` is the incoming seat count.
pub fn check_capacity(available: i32, taken: i64, requested: i32) -> Result<(), CoreError> {
    let remaining = i64::from(available) - taken;
    if i64::from(requested) > remaining {
        Err(CoreError::CapacityExceeded {
            requested,
            // remaining can go briefly negative if available_seats was ever
            // edited below the committed sum; clamp for the error message.
            remaining: remaining.max(0) as i32,
        })
    } else {
        Ok(())
    }
}

/// Reducing a ride's seat total below the committed sum would create
/// retroactive oversell; reject it.
pub fn check_seat_reduction(new_available: i32, committed: i64) -> Result<(), CoreError> {
    if i64::from(new_available) < committed {
        Err(CoreError::SeatsBelowCommitted { committed })
    } else {
        Ok(())
    }
}

/// Validate a participant status transition against the state machine.
pub fn check_transition(
    from: ParticipantStatus,
    to: ParticipantStatus,
) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

/// A ride auto-completes when its last CONFIRMED participant finishes.
pub fn ride_auto_completes(confirmed_remaining: i64) -> bool {
    confirmed_remaining == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ParticipantStatus::*;

    fn part(status: ParticipantStatus, seats: i32) -> (StatusId, i32) {
        (status.id(), seats)
    }

    #[test]
    fn test_seats_taken_skips_cancelled() {
        let parts = [part(Pending, 1), part(Confirmed, 2), part(Cancelled, 3), part(Completed, 1)];
        assert_eq!(seats_taken(&parts), 4);
        assert_eq!(seats_taken(&[]), 0);
    }

    #[test]
    fn test_capacity_exact_fit_allowed() {
        assert_matches!(check_capacity(3, 1, 2), Ok(()));
        assert_matches!(
            check_capacity(3, 2, 2),
            Err(CoreError::CapacityExceeded { requested: 2, remaining: 1 })
        );
    }

    #[test]
    fn test_capacity_remaining_clamped_when_oversold() {
        // A historically oversold ride reports zero remaining, not negative.
        assert_matches!(
            check_capacity(2, 5, 1),
            Err(CoreError::CapacityExceeded { requested: 1, remaining: 0 })
        );
    }

    #[test]
    fn test_seat_reduction_floor_is_committed_sum() {
        assert_matches!(check_seat_reduction(3, 3), Ok(()));
        assert_matches!(
            check_seat_reduction(2, 3),
            Err(CoreError::SeatsBelowCommitted { committed: 3 })
        );
    }

    #[test]
    fn test_transition_rules_match_state_machine() {
        assert_matches!(check_transition(Pending, Confirmed), Ok(()));
        assert_matches!(check_transition(Confirmed, Completed), Ok(()));
        assert_matches!(
            check_transition(Pending, Completed),
            Err(CoreError::InvalidTransition { from: Pending, to: Completed })
        );
        assert_matches!(
            check_transition(Completed, Cancelled),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn test_auto_completion_requires_zero_confirmed() {
        assert!(ride_auto_completes(0));
        assert!(!ride_auto_completes(1));
    }

    /// The worked example from the service contract: a two-seat ride accepts
    /// 1 seat, rejects 2, accepts another 1, then rejects everything.
    #[test]
    fn test_two_seat_ride_scenario() {
        let available = 2;
        let mut parts: Vec<(StatusId, i32)> = Vec::new();

        assert_matches!(check_capacity(available, seats_taken(&parts), 1), Ok(()));
        parts.push(part(Pending, 1));

        assert_matches!(
            check_capacity(available, seats_taken(&parts), 2),
            Err(CoreError::CapacityExceeded { requested: 2, remaining: 1 })
        );

        assert_matches!(check_capacity(available, seats_taken(&parts), 1), Ok(()));
        parts.push(part(Pending, 1));

        assert_matches!(
            check_capacity(available, seats_taken(&parts), 1),
            Err(CoreError::CapacityExceeded { requested: 1, remaining: 0 })
        );

        // Cancelling a booking frees its seats again.
        parts[0].0 = Cancelled.id();
        assert_matches!(check_capacity(available, seats_taken(&parts), 1), Ok(()));
    }
}
