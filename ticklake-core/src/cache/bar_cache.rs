//! Day-of-bars chain.
//!
//! One blob per (symbol, period, UTC day): a JSON array of the day's bars,
//! ascending. On a full miss the day is rebuilt by decoding its 24 hour files
//! through the tick chain and aggregating them.

use super::tick_cache::TickCache;
use super::{read_through, render_stats, Layer};
use crate::aggregate::{BarAggregator, BarCollector};
use crate::codec::TickVisitor;
use crate::domain::{Bar, Period};
use crate::error::DataError;
use crate::paths::hour_paths;
use crate::sequence::Sequence;
use bytes::Bytes;
use chrono::{Duration, NaiveDate, NaiveTime};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarKey {
    pub symbol: String,
    pub period: Period,
    pub day: NaiveDate,
}

impl BarKey {
    pub fn new(symbol: impl Into<String>, period: Period, day: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            day,
        }
    }

    /// `bars/{period}/{symbol}/{yyyy-MM-dd}.json`
    pub fn key(&self) -> String {
        format!(
            "bars/{}/{}/{}.json",
            self.period.label(),
            self.symbol,
            self.day.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for BarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

pub struct BarCache {
    layers: Vec<Layer>,
    ticks: Arc<TickCache>,
}

impl BarCache {
    pub fn new(layers: Vec<Layer>, ticks: Arc<TickCache>) -> Self {
        Self { layers, ticks }
    }

    /// Bars of one day, ascending. `tick_visitor` only sees ticks when the
    /// day has to be rebuilt from hour files.
    #[tracing::instrument(level = "debug", skip(self, key, tick_visitor), fields(key = %key))]
    pub fn get_day(
        &self,
        key: &BarKey,
        tick_visitor: Option<TickVisitor>,
    ) -> Result<Vec<Bar>, DataError> {
        let data = read_through(&self.layers, &key.key(), |_| {
            let bars = self.assemble_day(key, tick_visitor)?;
            Ok(Bytes::from(serde_json::to_vec(&bars)?))
        })?;
        let bars: Vec<Bar> = serde_json::from_slice(&data)?;
        validate_day(key, &bars)?;
        Ok(bars)
    }

    fn assemble_day(
        &self,
        key: &BarKey,
        tick_visitor: Option<TickVisitor>,
    ) -> Result<Vec<Bar>, DataError> {
        let start = key.day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);

        let sink = Arc::new(BarCollector::default());
        let aggregator = BarAggregator::new(key.period, sink.clone());
        let mut ticks = 0usize;
        for path in hour_paths(&key.symbol, start, end)? {
            let mut reader = self.ticks.reader(&path, tick_visitor.clone())?;
            while reader.has_next()? {
                aggregator.add(&reader.next_item()?)?;
                ticks += 1;
            }
            reader.close()?;
        }
        aggregator.load_end();

        let mut bars = sink.take();
        bars.sort_by_key(|bar| bar.start);
        debug!(key = %key, ticks, bars = bars.len(), "day aggregated from ticks");
        validate_day(key, &bars)?;
        Ok(bars)
    }

    pub fn tick_cache(&self) -> &Arc<TickCache> {
        &self.ticks
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn stats(&self) -> String {
        render_stats(&self.layers, "aggregate")
    }
}

fn validate_day(key: &BarKey, bars: &[Bar]) -> Result<(), DataError> {
    let max = key.period.max_bars_per_day();
    if bars.len() > max {
        return Err(DataError::ValidationError(format!(
            "{key} holds {} bars; a day has at most {max}",
            bars.len()
        )));
    }
    for bar in bars {
        bar.validate()?;
        if bar.symbol != key.symbol || bar.period != key.period || bar.start.date_naive() != key.day {
            return Err(DataError::ValidationError(format!(
                "{key} contains foreign bar {} {} at {}",
                bar.symbol, bar.period, bar.start
            )));
        }
    }
    Ok(())
}
