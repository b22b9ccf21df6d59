use std::{cmp::Ordering, fmt, ops::Range};

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// 予約できる時間の長さ
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Thirty,
    Sixty,
    Ninety,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Thirty, Period::Sixty, Period::Ninety];

    pub fn minutes(self) -> i64 {
        match self {
            Period::Thirty => 30,
            Period::Sixty => 60,
            Period::Ninety => 90,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl TryFrom<i64> for Period {
    type Error = ValidationError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Period::ALL
            .into_iter()
            .find(|p| p.minutes() == minutes)
            .ok_or(ValidationError::UnsupportedPeriod(minutes))
    }
}

impl TryFrom<Duration> for Period {
    type Error = ValidationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value != Duration::minutes(value.num_minutes()) {
            return Err(ValidationError::UnsupportedPeriod(value.num_minutes()));
        }
        Period::try_from(value.num_minutes())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} Minutes", self.minutes())
    }
}

/// コートの予約
///
/// 生成後は変更されない。キャンセルは予約ごと取り除く。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ReservationRecord")]
pub struct Reservation {
    name: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Reservation {
    pub fn create(
        name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        Self::validate_name(&name)?;
        Self::validate_time(start, end)?;
        Ok(Self { name, start, end })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn time(&self) -> Range<NaiveDateTime> {
        self.start..self.end
    }

    pub fn is_keyed_by(&self, name: &str, start: NaiveDateTime) -> bool {
        self.name == name && self.start == start
    }

    pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    fn validate_time(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTime(start, end));
        }
        for time in [start, end] {
            if time.second() != 0 || time.nanosecond() != 0 {
                return Err(ValidationError::SubMinuteTime(time));
            }
        }
        Period::try_from(end - start)?;
        Ok(())
    }
}

impl Ord for Reservation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Reservation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Deserialize)]
struct ReservationRecord {
    name: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<ReservationRecord> for Reservation {
    type Error = ValidationError;

    fn try_from(value: ReservationRecord) -> Result<Self, Self::Error> {
        Reservation::create(value.name, value.start, value.end)
    }
}
