//! Tick — a single priced market event.

use super::stream::{Source, StreamId};
use super::Timestamped;
use crate::error::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const MIN_SYMBOL_LEN: usize = 6;

/// Ask/bid quote at a UTC millisecond. Prices are integer points as stored by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub stream: StreamId,
    pub ask: i32,
    pub bid: i32,
    pub ask_volume: f32,
    pub bid_volume: f32,
    pub source: Source,
}

impl Tick {
    /// Check the constraints every surfaced tick must satisfy.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbol.len() < MIN_SYMBOL_LEN {
            return Err(DataError::ValidationError(format!(
                "tick symbol '{}' shorter than {MIN_SYMBOL_LEN} chars",
                self.symbol
            )));
        }
        if self.ask < 0 || self.bid < 0 {
            return Err(DataError::ValidationError(format!(
                "negative price in {} tick at {}: ask={} bid={}",
                self.symbol, self.time, self.ask, self.bid
            )));
        }
        for (name, v) in [("ask_volume", self.ask_volume), ("bid_volume", self.bid_volume)] {
            if !(v >= 0.0) {
                return Err(DataError::ValidationError(format!(
                    "invalid {name} {v} in {} tick at {}",
                    self.symbol, self.time
                )));
            }
        }
        Ok(())
    }

    /// Order by stream kind (backtest before realtime), then symbol, then time.
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.stream
            .kind()
            .cmp(&other.stream.kind())
            .then_with(|| self.symbol.cmp(&other.symbol))
            .then_with(|| self.time.cmp(&other.time))
    }
}

impl Timestamped for Tick {
    fn time_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }
}
