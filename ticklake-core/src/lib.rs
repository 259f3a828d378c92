//! Ticklake Core — hourly FX tick archive retrieval, caching and bar aggregation.
//!
//! This crate contains the whole retrieval pipeline:
//! - Archive addressing (symbol and UTC range to hour-file keys)
//! - The hour-file codec (LZMA-compressed 20-byte big-endian records)
//! - Read-through cache chains over disk, a shared object store and the provider
//! - Rate-limited, retrying direct fetch
//! - Tick-to-bar aggregation and bar roll-up
//! - Lazy pull sequences and the queries built from them
//! - Concurrent cache warm-up

pub mod aggregate;
pub mod cache;
pub mod codec;
pub mod config;
pub mod criteria;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod primer;
pub mod search;
pub mod sequence;

pub use config::LakeConfig;
pub use error::DataError;
pub use search::{BarVisitor, TickLake, TickLakeBuilder};
