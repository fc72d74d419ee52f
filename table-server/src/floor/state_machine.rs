//! 桌台状态机
//!
//! Transition legality lives in one lookup table. Callers never flip a
//! table's status directly: the ledger, the scheduler and manual overrides
//! all ask [`check`] / [`check_override`] first.

use shared::models::TableStatus;

use super::error::{FloorError, FloorResult};

/// What caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Walk-in (or not-yet-imminent reservation) seated
    SeatGuests,
    /// Confirmed reservation falls inside the lookahead window
    ReservationImminent,
    /// Guests seated against the reservation holding the table
    SeatReservation,
    /// Reservation cancelled, no-show or window elapsed
    ReleaseReservation,
    ClearTable,
    MarkReady,
    ManualOverride,
}

use TableStatus::*;

/// (from, to, trigger)
const TRANSITIONS: &[(TableStatus, TableStatus, Trigger)] = &[
    (Available, Occupied, Trigger::SeatGuests),
    (Available, Reserved, Trigger::ReservationImminent),
    (Reserved, Occupied, Trigger::SeatReservation),
    (Reserved, Available, Trigger::ReleaseReservation),
    (Occupied, Cleaning, Trigger::ClearTable),
    (Cleaning, Available, Trigger::MarkReady),
    (Available, OutOfService, Trigger::ManualOverride),
    (Occupied, OutOfService, Trigger::ManualOverride),
    (Reserved, OutOfService, Trigger::ManualOverride),
    (Cleaning, OutOfService, Trigger::ManualOverride),
    (OutOfService, Available, Trigger::ManualOverride),
];

/// Is `from -> to` legal for this trigger
pub fn is_allowed(from: TableStatus, to: TableStatus, trigger: Trigger) -> bool {
    TRANSITIONS
        .iter()
        .any(|&(f, t, tr)| f == from && t == to && tr == trigger)
}

/// Is `from -> to` in the table at all, whatever the trigger
pub fn is_listed(from: TableStatus, to: TableStatus) -> bool {
    TRANSITIONS.iter().any(|&(f, t, _)| f == from && t == to)
}

pub fn check(table_id: i64, from: TableStatus, to: TableStatus, trigger: Trigger) -> FloorResult<()> {
    if is_allowed(from, to, trigger) {
        Ok(())
    } else {
        Err(FloorError::InvalidTransition { table_id, from, to })
    }
}

/// Manual `set_status`: any listed transition, except that guests only ever
/// arrive through seating.
pub fn check_override(table_id: i64, from: TableStatus, to: TableStatus) -> FloorResult<()> {
    if to != Occupied && is_listed(from, to) {
        Ok(())
    } else {
        Err(FloorError::InvalidTransition { table_id, from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_cycle() {
        assert!(is_allowed(Available, Occupied, Trigger::SeatGuests));
        assert!(is_allowed(Occupied, Cleaning, Trigger::ClearTable));
        assert!(is_allowed(Cleaning, Available, Trigger::MarkReady));
    }

    #[test]
    fn triggers_are_not_interchangeable() {
        assert!(!is_allowed(Available, Occupied, Trigger::SeatReservation));
        assert!(!is_allowed(Reserved, Occupied, Trigger::SeatGuests));
        assert!(!is_allowed(Cleaning, Available, Trigger::ClearTable));
    }

    #[test]
    fn every_state_can_go_out_of_service_and_back() {
        for from in [Available, Occupied, Reserved, Cleaning] {
            assert!(is_allowed(from, OutOfService, Trigger::ManualOverride), "{from}");
        }
        assert!(is_allowed(OutOfService, Available, Trigger::ManualOverride));
        assert!(!is_listed(OutOfService, Cleaning));
        assert!(!is_listed(OutOfService, Reserved));
    }

    #[test]
    fn unlisted_transitions_fail() {
        let mut legal = 0;
        for from in TableStatus::ALL {
            for to in TableStatus::ALL {
                if is_listed(from, to) {
                    legal += 1;
                } else {
                    assert!(matches!(
                        check(1, from, to, Trigger::ManualOverride),
                        Err(FloorError::InvalidTransition { .. })
                    ));
                }
            }
        }
        assert_eq!(legal, TRANSITIONS.len());
    }

    #[test]
    fn override_never_seats_guests() {
        assert!(check_override(1, Available, Occupied).is_err());
        assert!(check_override(1, Reserved, Occupied).is_err());
        assert!(check_override(1, Occupied, Cleaning).is_ok());
        assert!(check_override(1, Occupied, OutOfService).is_ok());
        assert!(check_override(1, Available, Reserved).is_ok());
        assert!(check_override(1, Cleaning, Occupied).is_err());
        assert!(check_override(1, Occupied, Available).is_err());
    }
}
