//! Bar — OHLC aggregate of ticks over one period.

use super::period::Period;
use super::stream::{Source, StreamId};
use super::tick::MIN_SYMBOL_LEN;
use super::Timestamped;
use crate::error::DataError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OHLC bar for one symbol and stream. Prices are integer points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub period: Period,
    pub start: DateTime<Utc>,
    pub open: i32,
    pub high: i32,
    pub low: i32,
    pub close: i32,
    pub stream: StreamId,
    pub source: Source,
}

impl Bar {
    /// Last millisecond covered by this bar.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::milliseconds(self.period.duration_ms() - 1)
    }

    fn same_series(&self, other: &Bar) -> bool {
        self.stream == other.stream && self.symbol == other.symbol
    }

    /// True if this bar lies inside `outer`: same stream and symbol, a shorter
    /// period, and a time span nested in `outer`'s.
    pub fn within(&self, outer: &Bar) -> bool {
        self.same_series(outer)
            && self.period < outer.period
            && self.start >= outer.start
            && self.end() <= outer.end()
    }

    pub fn surrounds(&self, inner: &Bar) -> bool {
        inner.within(self)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbol.len() < MIN_SYMBOL_LEN {
            return Err(DataError::ValidationError(format!(
                "bar symbol '{}' shorter than {MIN_SYMBOL_LEN} chars",
                self.symbol
            )));
        }
        if self.period.floor(self.start) != self.start {
            return Err(DataError::ValidationError(format!(
                "{} bar start {} not aligned to period {}",
                self.symbol, self.start, self.period
            )));
        }
        if self.low < 0 {
            return Err(DataError::ValidationError(format!(
                "{} bar at {} has negative low {}",
                self.symbol, self.start, self.low
            )));
        }
        let sane = self.high >= self.low
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close);
        if !sane {
            return Err(DataError::ValidationError(format!(
                "{} bar at {} has inconsistent OHLC ({}, {}, {}, {})",
                self.symbol, self.start, self.open, self.high, self.low, self.close
            )));
        }
        Ok(())
    }
}

impl Timestamped for Bar {
    fn time_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }
}
