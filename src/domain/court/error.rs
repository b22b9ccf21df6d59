use chrono::{NaiveDate, NaiveDateTime};
use derive_more::{Display, Error};

/// 入力値のエラー
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 名前が空です
    #[display(fmt = "Name must not be empty")]
    EmptyName,
    /// 開始時刻が終了時刻より前ではありません
    #[display(fmt = "Start {} is not before end {}", _0, _1)]
    InvalidTime(NaiveDateTime, NaiveDateTime),
    /// 分単位ではない時刻です
    #[display(fmt = "Time {} must be a whole minute", _0)]
    SubMinuteTime(#[error(not(source))] NaiveDateTime),
    /// 予約できない時間の長さです
    #[display(fmt = "Unsupported period of {} minutes (30, 60 or 90 allowed)", _0)]
    UnsupportedPeriod(#[error(not(source))] i64),
    /// 直前の予約・キャンセルはできません
    #[display(
        fmt = "Reservation at {} must be made at least {} minutes in advance",
        _0,
        _1
    )]
    TooSoon(NaiveDateTime, i64),
    /// 期間の開始日が終了日より後です
    #[display(fmt = "Start date {} is after end date {}", _0, _1)]
    InvalidDateRange(NaiveDate, NaiveDate),
    /// 対応していないファイル形式です
    #[display(fmt = "Unsupported file format: {} (json or csv allowed)", _0)]
    UnsupportedFormat(#[error(not(source))] String),
}

/// 既存の予約との衝突
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[display(fmt = "{} - {} overlaps an existing reservation", _0, _1)]
    Overlap(NaiveDateTime, NaiveDateTime),
    #[display(
        fmt = "{} has reached the reservation limit for this week ({})",
        name,
        limit
    )]
    WeeklyQuotaExceeded { name: String, limit: usize },
    #[display(fmt = "No free slot within {} days from {}", _1, _0)]
    NoAvailability(NaiveDateTime, i64),
}
