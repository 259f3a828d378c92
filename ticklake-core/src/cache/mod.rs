//! Tiered read-through caches.
//!
//! A chain is an ordered list of [`Layer`]s ending in an origin (the direct
//! fetcher for hour files, tick aggregation for bar days). A read checks each
//! layer in turn; the first hit is returned and every layer that missed on
//! the way down saves the value on the way back up.

pub mod bar_cache;
pub mod counters;
pub mod disk;
pub mod remote;
pub mod tick_cache;

pub use bar_cache::{BarCache, BarKey};
pub use counters::{CounterSnapshot, TierCounters};
pub use disk::DiskStore;
pub use remote::RemoteStore;
pub use tick_cache::TickCache;

use crate::error::DataError;
use bytes::Bytes;
use tracing::debug;

/// Storage behind one cache layer.
pub enum Tier {
    Disk(DiskStore),
    ObjectStore(RemoteStore),
}

impl Tier {
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Disk(_) => "disk",
            Tier::ObjectStore(_) => "object-store",
        }
    }

    pub fn check(&self, key: &str) -> Result<Option<Bytes>, DataError> {
        match self {
            Tier::Disk(store) => store.check(key),
            Tier::ObjectStore(store) => store.check(key),
        }
    }

    pub fn save(&self, key: &str, data: &Bytes) -> Result<(), DataError> {
        match self {
            Tier::Disk(store) => store.save(key, data),
            Tier::ObjectStore(store) => store.save(key, data),
        }
    }
}

/// A tier plus the counters only it updates.
pub struct Layer {
    tier: Tier,
    counters: TierCounters,
}

impl Layer {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            counters: TierCounters::default(),
        }
    }

    pub fn tier(&self) -> &Tier {
        &self.tier
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

impl From<Tier> for Layer {
    fn from(tier: Tier) -> Self {
        Layer::new(tier)
    }
}

/// Read `key` through `layers`, falling back to `origin` when every layer misses.
pub fn read_through<F>(layers: &[Layer], key: &str, origin: F) -> Result<Bytes, DataError>
where
    F: FnOnce(&str) -> Result<Bytes, DataError>,
{
    let Some((layer, fallback)) = layers.split_first() else {
        return origin(key);
    };

    if let Some(hit) = layer.tier.check(key)? {
        layer.counters.record_hit();
        debug!(tier = layer.tier.name(), key, "cache hit");
        return Ok(hit);
    }
    layer.counters.record_miss();
    debug!(tier = layer.tier.name(), key, "cache miss");

    let data = read_through(fallback, key, origin)?;
    layer.tier.save(key, &data)?;
    Ok(data)
}

/// `disk: ... | object-store: ... | <origin>`.
pub fn render_stats(layers: &[Layer], origin: &str) -> String {
    match layers.split_first() {
        None => origin.to_string(),
        Some((layer, fallback)) => format!(
            "{}: {} | {}",
            layer.tier.name(),
            layer.counters(),
            render_stats(fallback, origin)
        ),
    }
}
