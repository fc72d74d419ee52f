//! Reservation Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::MILLIS_PER_MINUTE;

/// Reservation status (预订状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Seated,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Seated => "seated",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// Only `confirmed` reservations move; everything else is final
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::Confirmed,
                Self::Seated | Self::Cancelled | Self::NoShow
            )
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "seated" => Ok(Self::Seated),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            other => Err(format!("Unknown reservation status: {}", other)),
        }
    }
}

/// Reservation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub store_id: i64,
    pub table_id: i64,
    pub party_size: i32,
    pub customer_name: String,
    pub phone: Option<String>,
    /// Requested start (Unix millis)
    pub reservation_time: i64,
    /// Estimate in minutes; 0 = unspecified, use the store default
    pub duration_minutes: i32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Reservation {
    /// Duration used for window math; the stored value is left untouched
    pub fn effective_duration(&self, default_minutes: i32) -> i32 {
        if self.duration_minutes > 0 {
            self.duration_minutes
        } else {
            default_minutes
        }
    }

    /// Half-open `[start, end)` window in millis
    pub fn window(&self, default_minutes: i32) -> (i64, i64) {
        let start = self.reservation_time;
        let length = i64::from(self.effective_duration(default_minutes)) * MILLIS_PER_MINUTE;
        let end = start.saturating_add(length);
        (start, end)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }
}

/// Two half-open windows overlap; touching boundaries do not
pub fn windows_overlap(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreate {
    pub table_id: i64,
    pub party_size: i32,
    pub customer_name: String,
    pub phone: Option<String>,
    pub reservation_time: i64,
    /// Omitted = 0 (store default applies)
    #[serde(default)]
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

/// Filter for listing reservations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationFilter {
    pub table_id: Option<i64>,
    pub status: Option<ReservationStatus>,
    /// Start time lower bound (inclusive, millis)
    pub from: Option<i64>,
    /// Start time upper bound (exclusive, millis)
    pub until: Option<i64>,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.table_id.is_none_or(|id| reservation.table_id == id)
            && self.status.is_none_or(|status| reservation.status == status)
            && self.from.is_none_or(|from| reservation.reservation_time >= from)
            && self.until.is_none_or(|until| reservation.reservation_time < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = MILLIS_PER_MINUTE;

    fn reservation(start_min: i64, duration: i32) -> Reservation {
        Reservation {
            id: 1,
            store_id: 1,
            table_id: 1,
            party_size: 2,
            customer_name: "Ana".to_string(),
            phone: None,
            reservation_time: start_min * MIN,
            duration_minutes: duration,
            status: ReservationStatus::Confirmed,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn zero_duration_uses_default_for_window_only() {
        let r = reservation(0, 0);
        assert_eq!(r.effective_duration(90), 90);
        assert_eq!(r.window(90), (0, 90 * MIN));
        assert_eq!(r.duration_minutes, 0);
    }

    #[test]
    fn window_end_saturates() {
        let mut r = reservation(0, 60);
        r.reservation_time = i64::MAX - 1;
        assert_eq!(r.window(90), (i64::MAX - 1, i64::MAX));
    }

    #[test]
    fn overlap_is_half_open() {
        // 18:00-19:30 vs 18:30-19:30 vs 19:30-20:30
        let first = reservation(18 * 60, 90).window(90);
        let second = reservation(18 * 60 + 30, 60).window(90);
        let third = reservation(19 * 60 + 30, 60).window(90);

        assert!(windows_overlap(first, second));
        assert!(!windows_overlap(first, third));
        assert!(!windows_overlap(third, first));
        assert!(windows_overlap(second, second));
    }

    #[test]
    fn only_confirmed_moves() {
        use ReservationStatus::*;
        assert!(Confirmed.can_transition_to(Seated));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!Confirmed.can_transition_to(Confirmed));
        for from in [Seated, Cancelled, NoShow] {
            for to in [Confirmed, Seated, Cancelled, NoShow] {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }
}
