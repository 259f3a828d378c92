//! Tick-to-bar aggregation and bar-to-bar roll-up.

pub mod aggregator;
pub mod rollup;

pub use aggregator::{BarAggregator, BarCollector, BarListener, OhlcBucket};
pub use rollup::roll_up;
