use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tier access counters. Only the owning tier records; everyone else reads snapshots.
///
/// Cache tiers record hits and misses and their retrieves are derived from
/// those, so a snapshot always has `hits + misses == retrieves`.
#[derive(Debug, Default)]
pub struct TierCounters {
    /// Retrieves of tiers without a hit/miss notion.
    retrieves: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    retries: AtomicU64,
}

impl TierCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// For tiers without a hit/miss notion (direct fetch).
    pub(crate) fn record_retrieve(&self) {
        self.retrieves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CounterSnapshot {
            retrieves: self.retrieves.load(Ordering::Relaxed) + hits + misses,
            hits,
            misses,
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub retrieves: u64,
    pub hits: u64,
    pub misses: u64,
    pub retries: u64,
}

impl CounterSnapshot {
    /// Hits as a percentage of retrieves; zero before the first retrieve.
    pub fn hit_rate(&self) -> f64 {
        if self.retrieves == 0 {
            0.0
        } else {
            self.hits as f64 * 100.0 / self.retrieves as f64
        }
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retrieved={} hits={} misses={} hit-rate={:.1}%",
            self.retrieves,
            self.hits,
            self.misses,
            self.hit_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_plus_misses_equal_retrieves() {
        let c = TierCounters::default();
        c.record_miss();
        c.record_hit();
        c.record_hit();
        let s = c.snapshot();
        assert_eq!(s.hits + s.misses, s.retrieves);
        assert!((s.hit_rate() - 66.666).abs() < 0.01);
        assert_eq!(
            s.to_string(),
            "retrieved=3 hits=2 misses=1 hit-rate=66.7%"
        );
    }

    #[test]
    fn snapshots_stay_consistent_under_contention() {
        let c = std::sync::Arc::new(TierCounters::default());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let c = std::sync::Arc::clone(&c);
                std::thread::spawn(move || {
                    for n in 0..10_000 {
                        if (n + i) % 3 == 0 {
                            c.record_miss();
                        } else {
                            c.record_hit();
                        }
                    }
                })
            })
            .collect();
        while !writers.iter().all(|w| w.is_finished()) {
            let s = c.snapshot();
            assert_eq!(s.hits + s.misses, s.retrieves);
        }
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(c.snapshot().retrieves, 40_000);
    }

    #[test]
    fn direct_retrieves_count_alone() {
        let c = TierCounters::default();
        c.record_retrieve();
        c.record_retrieve();
        c.record_retry();
        let s = c.snapshot();
        assert_eq!((s.retrieves, s.hits, s.misses, s.retries), (2, 0, 0, 1));
    }

    #[test]
    fn empty_hit_rate_is_zero() {
        assert_eq!(CounterSnapshot::default().hit_rate(), 0.0);
    }
}
