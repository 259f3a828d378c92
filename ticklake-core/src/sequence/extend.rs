//! Window-extension searches.
//!
//! Both strategies query disjoint, adjacent time windows through a
//! [`WindowFetch`] and keep only elements whose timestamp falls inside the
//! window that was asked for, so no element is returned twice.

use super::{Sequence, VecSequence};
use crate::domain::Timestamped;
use crate::error::DataError;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::debug;

/// Fetch every element in the inclusive window `[from, to]`.
pub type WindowFetch<T> =
    Box<dyn FnMut(DateTime<Utc>, DateTime<Utc>) -> Result<Vec<T>, DataError> + Send>;

fn in_window<T: Timestamped>(item: &T, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    (from.timestamp_millis()..=to.timestamp_millis()).contains(&item.time_ms())
}

fn one_ms() -> Duration {
    Duration::milliseconds(1)
}

/// Collects the `count` most recent elements at or before `end`, widening
/// toward the past one window at a time until enough are found or `floor`
/// is reached. Yields ascending.
pub struct BackwardExtension<T> {
    fetch: Option<WindowFetch<T>>,
    end: DateTime<Utc>,
    window: Duration,
    count: usize,
    floor: DateTime<Utc>,
    resolved: VecSequence<T>,
}

impl<T: Timestamped> BackwardExtension<T> {
    pub fn new(
        fetch: WindowFetch<T>,
        end: DateTime<Utc>,
        window: Duration,
        count: usize,
        floor: DateTime<Utc>,
    ) -> Self {
        Self {
            fetch: Some(fetch),
            end,
            window,
            count,
            floor,
            resolved: VecSequence::empty(),
        }
    }

    fn resolve(&mut self) -> Result<(), DataError> {
        let Some(mut fetch) = self.fetch.take() else {
            return Ok(());
        };
        if self.window <= Duration::zero() {
            return Err(DataError::ValidationError(
                "extension window must be positive".into(),
            ));
        }

        let mut found: Vec<T> = Vec::new();
        let mut hi = self.end;
        let mut windows = 0usize;
        while self.count > 0 && hi >= self.floor {
            let lo = (hi - self.window + one_ms()).max(self.floor);
            let chunk = fetch(lo, hi)?;
            found.extend(chunk.into_iter().filter(|item| in_window(item, lo, hi)));
            windows += 1;
            if found.len() >= self.count || lo <= self.floor {
                break;
            }
            hi = lo - one_ms();
        }

        found.sort_by_key(|item| item.time_ms());
        let excess = found.len().saturating_sub(self.count);
        found.drain(..excess);
        debug!(windows, found = found.len(), wanted = self.count, "backward extension resolved");
        self.resolved = VecSequence::new(found);
        Ok(())
    }
}

impl<T: Timestamped> Sequence for BackwardExtension<T> {
    type Item = T;

    fn has_next(&mut self) -> Result<bool, DataError> {
        self.resolve()?;
        self.resolved.has_next()
    }

    fn next_item(&mut self) -> Result<T, DataError> {
        self.resolve()?;
        self.resolved.next_item()
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.fetch = None;
        self.resolved.close()
    }
}

/// Yields up to `count` elements at or after `start`, fetching one window
/// ahead only when the buffer runs dry. Stops at `horizon`.
pub struct ForwardExtension<T> {
    fetch: WindowFetch<T>,
    cursor: DateTime<Utc>,
    window: Duration,
    remaining: usize,
    horizon: DateTime<Utc>,
    buffer: VecDeque<T>,
}

impl<T: Timestamped> ForwardExtension<T> {
    pub fn new(
        fetch: WindowFetch<T>,
        start: DateTime<Utc>,
        window: Duration,
        count: usize,
        horizon: DateTime<Utc>,
    ) -> Self {
        Self {
            fetch,
            cursor: start,
            window,
            remaining: count,
            horizon,
            buffer: VecDeque::new(),
        }
    }

    fn fill(&mut self) -> Result<bool, DataError> {
        if self.remaining == 0 {
            return Ok(false);
        }
        if self.window <= Duration::zero() {
            return Err(DataError::ValidationError(
                "extension window must be positive".into(),
            ));
        }
        while self.buffer.is_empty() && self.cursor <= self.horizon {
            let lo = self.cursor;
            let hi = (lo + self.window - one_ms()).min(self.horizon);
            let mut chunk: Vec<T> = (self.fetch)(lo, hi)?
                .into_iter()
                .filter(|item| in_window(item, lo, hi))
                .collect();
            chunk.sort_by_key(|item| item.time_ms());
            self.buffer.extend(chunk);
            self.cursor = hi + one_ms();
        }
        Ok(!self.buffer.is_empty())
    }
}

impl<T: Timestamped> Sequence for ForwardExtension<T> {
    type Item = T;

    fn has_next(&mut self) -> Result<bool, DataError> {
        self.fill()
    }

    fn next_item(&mut self) -> Result<T, DataError> {
        if !self.fill()? {
            return Err(DataError::SequenceExhausted);
        }
        let item = self.buffer.pop_front().ok_or(DataError::SequenceExhausted)?;
        self.remaining -= 1;
        Ok(item)
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.remaining = 0;
        self.buffer.clear();
        Ok(())
    }
}
