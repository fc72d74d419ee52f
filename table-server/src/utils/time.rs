//! 时间工具: 时钟与业务时区转换
//!
//! 协调器内部只处理 `i64` Unix millis；日期→时间戳在 API handler 层转换。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use shared::error::{AppError, AppResult};
use shared::types::MILLIS_PER_MINUTE;

/// Time source for the coordinator
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.now.fetch_add(minutes * MILLIS_PER_MINUTE, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Unix millis → 业务时区日期
pub fn local_date(millis: i64, tz: Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.date_naive())
}

/// 日期 + 时分秒 → Unix millis (业务时区)
///
/// DST gap fallback: 本地时间不存在时按 UTC 解释。
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date
        .and_hms_opt(hour, min, sec)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(date, 0, 0, 0, tz)
}

/// 次日 00:00:00 的 Unix millis，调用方使用 `< end` 语义
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    date_hms_to_millis(next_day, 0, 0, 0, tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_are_half_open() {
        let tz = chrono_tz::Europe::Madrid;
        let date = parse_date("2026-07-01").unwrap();
        let start = day_start_millis(date, tz);
        let end = day_end_millis(date, tz);
        assert_eq!(end - start, 24 * 60 * MILLIS_PER_MINUTE);
        assert_eq!(local_date(start, tz), Some(date));
        assert_ne!(local_date(end, tz), Some(date));
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);
        clock.advance_minutes(2);
        assert_eq!(clock.now_millis(), 1_000 + 2 * MILLIS_PER_MINUTE);
        clock.set(5);
        assert_eq!(clock.now_millis(), 5);
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(parse_date("2026-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
    }
}
