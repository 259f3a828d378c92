use crate::domain::{Bar, Period, Source, StreamId, Tick};
use crate::error::DataError;
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Receives every finished bar.
pub trait BarListener: Send + Sync {
    fn on_bar(&self, bar: Bar);
}

impl<F> BarListener for F
where
    F: Fn(Bar) + Send + Sync,
{
    fn on_bar(&self, bar: Bar) {
        self(bar)
    }
}

/// Listener that keeps finished bars until taken.
#[derive(Debug, Default)]
pub struct BarCollector {
    bars: Mutex<Vec<Bar>>,
}

impl BarCollector {
    pub fn take(&self) -> Vec<Bar> {
        std::mem::take(&mut *self.bars.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BarListener for BarCollector {
    fn on_bar(&self, bar: Bar) {
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bar);
    }
}

/// Running OHLC for one open `[start, end)` bucket of one stream and symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcBucket {
    pub stream: StreamId,
    pub symbol: String,
    pub period: Period,
    pub start: DateTime<Utc>,
    /// Exclusive.
    pub end: DateTime<Utc>,
    pub open: i32,
    pub high: i32,
    pub low: i32,
    pub close: i32,
    pub ticks: usize,
    pub source: Source,
}

impl OhlcBucket {
    /// Bucket containing `tick`, seeded from its bid.
    pub fn open(tick: &Tick, period: Period) -> Self {
        let start = period.floor(tick.time);
        Self {
            stream: tick.stream,
            symbol: tick.symbol.clone(),
            period,
            start,
            end: start + Duration::milliseconds(period.duration_ms()),
            open: tick.bid,
            high: tick.bid,
            low: tick.bid,
            close: tick.bid,
            ticks: 1,
            source: tick.source,
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }

    pub fn add(&mut self, tick: &Tick) -> Result<(), DataError> {
        if tick.stream != self.stream || tick.symbol != self.symbol {
            return Err(DataError::ValidationError(format!(
                "tick for {}/{} added to bucket of {}/{}",
                tick.stream, tick.symbol, self.stream, self.symbol
            )));
        }
        if !self.contains(tick.time) {
            return Err(DataError::ValidationError(format!(
                "tick at {} outside bucket [{}, {})",
                tick.time, self.start, self.end
            )));
        }
        self.high = self.high.max(tick.bid);
        self.low = self.low.min(tick.bid);
        self.close = tick.bid;
        self.ticks += 1;
        self.source = self.source.combine(tick.source);
        Ok(())
    }

    pub fn to_bar(&self) -> Bar {
        Bar {
            symbol: self.symbol.clone(),
            period: self.period,
            start: self.start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            stream: self.stream,
            source: self.source,
        }
    }
}

type BucketKey = (StreamId, String);

/// Turns ordered ticks into bars of one period, independently per stream and symbol.
///
/// Safe to feed from several threads as long as each (stream, symbol) key
/// is fed in time order by one producer.
pub struct BarAggregator {
    period: Period,
    buckets: Mutex<HashMap<BucketKey, OhlcBucket>>,
    listener: Arc<dyn BarListener>,
}

impl BarAggregator {
    pub fn new(period: Period, listener: Arc<dyn BarListener>) -> Self {
        Self {
            period,
            buckets: Mutex::new(HashMap::new()),
            listener,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn open_buckets(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn add(&self, tick: &Tick) -> Result<(), DataError> {
        let finished = {
            let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
            match buckets.entry((tick.stream, tick.symbol.clone())) {
                Entry::Vacant(slot) => {
                    slot.insert(OhlcBucket::open(tick, self.period));
                    None
                }
                Entry::Occupied(mut slot) => {
                    let bucket = slot.get_mut();
                    if tick.time >= bucket.end {
                        let done = bucket.to_bar();
                        *bucket = OhlcBucket::open(tick, self.period);
                        Some(done)
                    } else if tick.time < bucket.start {
                        // Out-of-order tick: the open bucket is dropped, not emitted.
                        warn!(
                            symbol = %tick.symbol,
                            tick_time = %tick.time,
                            bucket_start = %bucket.start,
                            discarded_ticks = bucket.ticks,
                            "tick precedes open bucket; starting a new bucket"
                        );
                        *bucket = OhlcBucket::open(tick, self.period);
                        None
                    } else {
                        bucket.add(tick)?;
                        None
                    }
                }
            }
        };
        if let Some(bar) = finished {
            self.listener.on_bar(bar);
        }
        Ok(())
    }

    /// Flush every open bucket, oldest first.
    pub fn load_end(&self) {
        let mut open: Vec<OhlcBucket> = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, bucket)| bucket)
            .collect();
        open.sort_by(|a, b| {
            (a.start, &a.symbol, a.stream).cmp(&(b.start, &b.symbol, b.stream))
        });
        debug!(flushed = open.len(), period = %self.period, "aggregation load end");
        for bucket in open {
            self.listener.on_bar(bucket.to_bar());
        }
    }
}
