use chrono::{Datelike, Duration, IsoWeek, NaiveDateTime};

pub const DEFAULT_LEAD_TIME_MINUTES: i64 = 60;
pub const DEFAULT_WEEKLY_LIMIT: usize = 2;
pub const DEFAULT_GRANULARITY_MINUTES: i64 = 30;
pub const DEFAULT_SEARCH_HORIZON_DAYS: i64 = 365;

/// 予約のルール
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingPolicy {
    /// 予約・キャンセルに必要な最低限の猶予
    pub lead_time: Duration,
    /// 一人あたりの週の予約上限
    pub weekly_limit: usize,
    /// 空き枠探索の刻み幅
    pub granularity: Duration,
    /// 空き枠探索の範囲
    pub search_horizon: Duration,
}

impl BookingPolicy {
    /// `start` が現在時刻から `lead_time` 未満かどうか
    pub fn too_soon(&self, start: NaiveDateTime, now: NaiveDateTime) -> bool {
        start - self.lead_time < now
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            lead_time: Duration::minutes(DEFAULT_LEAD_TIME_MINUTES),
            weekly_limit: DEFAULT_WEEKLY_LIMIT,
            granularity: Duration::minutes(DEFAULT_GRANULARITY_MINUTES),
            search_horizon: Duration::days(DEFAULT_SEARCH_HORIZON_DAYS),
        }
    }
}

/// ISO 8601 の週（月曜始まり）
pub fn week_of(time: NaiveDateTime) -> IsoWeek {
    time.date().iso_week()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_week_starts_on_monday() {
        let monday = at(2023, 5, 22, 0, 0);
        let sunday = at(2023, 5, 28, 23, 59);
        let previous_sunday = at(2023, 5, 21, 23, 59);
        assert_eq!(week_of(monday), week_of(sunday));
        assert_ne!(week_of(monday), week_of(previous_sunday));
    }

    #[test]
    fn test_week_distinguishes_years() {
        assert_ne!(week_of(at(2023, 6, 5, 10, 0)), week_of(at(2024, 6, 3, 10, 0)));
        // 2024-12-30 belongs to ISO week 1 of 2025
        assert_eq!(week_of(at(2024, 12, 30, 10, 0)), week_of(at(2025, 1, 5, 10, 0)));
    }

    #[test]
    fn test_too_soon() {
        let policy = BookingPolicy::default();
        let now = at(2024, 6, 3, 8, 0);
        assert!(policy.too_soon(at(2024, 6, 3, 8, 30), now));
        assert!(policy.too_soon(at(2024, 6, 3, 8, 59), now));
        assert!(!policy.too_soon(at(2024, 6, 3, 9, 0), now));
        assert!(!policy.too_soon(at(2024, 6, 3, 10, 0), now));
        assert!(policy.too_soon(at(2024, 6, 2, 10, 0), now));
    }
}
