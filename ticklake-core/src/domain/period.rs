//! Period — the fixed bucketing durations bars are aggregated over.

use crate::error::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MILLIS_PER_MINUTE: i64 = 60_000;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Bar period. Ordered from shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "10m")]
    TenMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Period {
    pub const ALL: [Period; 7] = [
        Period::FiveMinutes,
        Period::TenMinutes,
        Period::FifteenMinutes,
        Period::ThirtyMinutes,
        Period::OneHour,
        Period::FourHours,
        Period::OneDay,
    ];

    pub const fn duration_ms(self) -> i64 {
        match self {
            Period::FiveMinutes => 5 * MILLIS_PER_MINUTE,
            Period::TenMinutes => 10 * MILLIS_PER_MINUTE,
            Period::FifteenMinutes => 15 * MILLIS_PER_MINUTE,
            Period::ThirtyMinutes => 30 * MILLIS_PER_MINUTE,
            Period::OneHour => MILLIS_PER_HOUR,
            Period::FourHours => 4 * MILLIS_PER_HOUR,
            Period::OneDay => MILLIS_PER_DAY,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Period::FiveMinutes => "5m",
            Period::TenMinutes => "10m",
            Period::FifteenMinutes => "15m",
            Period::ThirtyMinutes => "30m",
            Period::OneHour => "1h",
            Period::FourHours => "4h",
            Period::OneDay => "1d",
        }
    }

    /// Most bars of this period a single UTC day can hold.
    pub const fn max_bars_per_day(self) -> usize {
        (MILLIS_PER_DAY / self.duration_ms()) as usize
    }

    /// Epoch milliseconds floored to the start of the containing period.
    pub fn floor_ms(self, epoch_ms: i64) -> i64 {
        epoch_ms - epoch_ms.rem_euclid(self.duration_ms())
    }

    pub fn floor(self, time: DateTime<Utc>) -> DateTime<Utc> {
        let floored = self.floor_ms(time.timestamp_millis());
        DateTime::from_timestamp_millis(floored).unwrap_or(time)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| DataError::ValidationError(format!("unknown period '{s}'")))
    }
}
