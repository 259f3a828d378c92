//! Domain types: ticks, bars, periods and stream identity.

pub mod bar;
pub mod period;
pub mod stream;
pub mod tick;

pub use bar::Bar;
pub use period::{Period, MILLIS_PER_DAY, MILLIS_PER_HOUR};
pub use stream::{Source, StreamId, StreamKind};
pub use tick::Tick;

/// Anything positioned on the UTC millisecond timeline.
pub trait Timestamped {
    fn time_ms(&self) -> i64;
}
