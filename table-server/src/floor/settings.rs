//! Store settings consumed (read-only) by the coordinator

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use shared::types::MILLIS_PER_MINUTE;

use crate::utils::time;

/// How far ahead a confirmed reservation starts holding its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationLookahead {
    /// Any reservation later today (store local date)
    SameDay,
    /// Reservations starting within this many minutes
    Minutes(i64),
}

impl FromStr for ReservationLookahead {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "same_day" => Ok(ReservationLookahead::SameDay),
            other => other
                .parse::<i64>()
                .ok()
                .filter(|m| *m >= 0)
                .map(ReservationLookahead::Minutes)
                .ok_or_else(|| format!("Invalid reservation lookahead: {}", other)),
        }
    }
}

/// 桌号生成规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberingStyle {
    /// `1, 2, 3...` across the store
    #[default]
    Numeric,
    /// First letter of the area name plus a counter within the area (`T1`, `T2`)
    AreaPrefixed,
}

impl FromStr for NumberingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "numeric" => Ok(NumberingStyle::Numeric),
            "area_prefixed" => Ok(NumberingStyle::AreaPrefixed),
            other => Err(format!("Invalid table numbering style: {}", other)),
        }
    }
}

impl fmt::Display for NumberingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingStyle::Numeric => write!(f, "numeric"),
            NumberingStyle::AreaPrefixed => write!(f, "area_prefixed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub store_id: i64,
    /// Used for window math when a reservation says `duration_minutes = 0`
    pub default_reservation_minutes: i32,
    pub lookahead: ReservationLookahead,
    pub numbering: NumberingStyle,
    pub timezone: Tz,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_id: 1,
            default_reservation_minutes: 90,
            lookahead: ReservationLookahead::SameDay,
            numbering: NumberingStyle::Numeric,
            timezone: chrono_tz::Europe::Madrid,
        }
    }
}

impl StoreSettings {
    /// Does a reservation starting at `start` hold its table right now
    pub fn is_imminent(&self, start: i64, now: i64) -> bool {
        if start <= now {
            return true;
        }
        match self.lookahead {
            ReservationLookahead::SameDay => {
                time::local_date(start, self.timezone) == time::local_date(now, self.timezone)
            }
            ReservationLookahead::Minutes(m) => start - now <= m * MILLIS_PER_MINUTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_env_values() {
        assert_eq!(
            "same_day".parse::<ReservationLookahead>(),
            Ok(ReservationLookahead::SameDay)
        );
        assert_eq!(
            "120".parse::<ReservationLookahead>(),
            Ok(ReservationLookahead::Minutes(120))
        );
        assert!("-5".parse::<ReservationLookahead>().is_err());
        assert_eq!(
            "area_prefixed".parse::<NumberingStyle>(),
            Ok(NumberingStyle::AreaPrefixed)
        );
        assert!("roman".parse::<NumberingStyle>().is_err());
    }

    #[test]
    fn same_day_uses_store_timezone() {
        let settings = StoreSettings::default();
        let tz = settings.timezone;
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let next = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();

        let now = time::date_hms_to_millis(day, 12, 0, 0, tz);
        assert!(settings.is_imminent(time::date_hms_to_millis(day, 23, 30, 0, tz), now));
        assert!(!settings.is_imminent(time::date_hms_to_millis(next, 0, 30, 0, tz), now));
    }

    #[test]
    fn minutes_lookahead() {
        let settings = StoreSettings {
            lookahead: ReservationLookahead::Minutes(60),
            ..StoreSettings::default()
        };
        let now = 1_000 * MILLIS_PER_MINUTE;
        assert!(settings.is_imminent(now + 60 * MILLIS_PER_MINUTE, now));
        assert!(!settings.is_imminent(now + 61 * MILLIS_PER_MINUTE, now));
        assert!(settings.is_imminent(now - 5, now));
    }
}
