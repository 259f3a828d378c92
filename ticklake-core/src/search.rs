//! Symbol and time-range queries over the cache chains.
//!
//! Every query returns a lazy [`BoxSequence`]; nothing is fetched or decoded
//! until the caller pulls. Closing a sequence releases whatever hour file or
//! day of bars it is positioned on.

use crate::cache::{BarCache, BarKey, DiskStore, Layer, RemoteStore, Tier, TickCache};
use crate::codec::TickVisitor;
use crate::config::LakeConfig;
use crate::criteria::Criteria;
use crate::domain::{Bar, Period, Tick};
use crate::error::DataError;
use crate::fetch::{DirectFetcher, HttpTransport, RateLimiter, Transport};
use crate::paths::paths_by_day;
use crate::primer::CachePrimer;
use crate::sequence::{
    BackwardExtension, BoxSequence, Concat, ForwardExtension, Mapped, SequenceExt, VecSequence,
    WindowFetch,
};
use chrono::{DateTime, Duration, Utc};
use object_store::ObjectStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, info};

/// Observer called with every bar a query hands out.
pub type BarVisitor = Arc<dyn Fn(&Bar) + Send + Sync>;

struct Inner {
    config: LakeConfig,
    ticks: Arc<TickCache>,
    bars: BarCache,
}

/// Entry point: the tick chain, the bar chain and the queries over them.
/// Cheap to clone; clones share caches, counters and the rate limiter.
#[derive(Clone)]
pub struct TickLake {
    inner: Arc<Inner>,
}

pub struct TickLakeBuilder {
    config: LakeConfig,
    object_store: Option<Arc<dyn ObjectStore>>,
    transport: Option<Arc<dyn Transport>>,
    limiter: Option<Arc<RateLimiter>>,
}

impl TickLakeBuilder {
    /// Use this store for the remote tier instead of `config.object_store`.
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share a limiter with other lakes talking to the same provider.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> Result<TickLake, DataError> {
        let config = self.config;
        config.validate()?;

        let limiter = match self.limiter {
            Some(limiter) => limiter,
            None => Arc::new(RateLimiter::new(config.fetch.rate_limit_per_sec)?),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(StdDuration::from_secs(
                config.fetch.timeout_secs,
            ))?),
        };
        let store = match self.object_store {
            Some(store) => Some(store),
            None => config.object_store.as_ref().map(|c| c.build()).transpose()?,
        };

        let layers = || -> Result<Vec<Layer>, DataError> {
            let mut layers = vec![Layer::new(Tier::Disk(DiskStore::new(&config.cache_root)))];
            if let Some(store) = &store {
                layers.push(Layer::new(Tier::ObjectStore(RemoteStore::new(Arc::clone(store))?)));
            }
            Ok(layers)
        };

        let fetcher = DirectFetcher::new(transport, limiter, &config.fetch);
        let ticks = Arc::new(TickCache::new(layers()?, fetcher));
        let bars = BarCache::new(layers()?, Arc::clone(&ticks));
        info!(
            cache_root = %config.cache_root.display(),
            remote = store.is_some(),
            "tick lake ready"
        );
        Ok(TickLake {
            inner: Arc::new(Inner {
                config,
                ticks,
                bars,
            }),
        })
    }
}

impl TickLake {
    pub fn builder(config: LakeConfig) -> TickLakeBuilder {
        TickLakeBuilder {
            config,
            object_store: None,
            transport: None,
            limiter: None,
        }
    }

    pub fn config(&self) -> &LakeConfig {
        &self.inner.config
    }

    pub fn tick_cache(&self) -> &Arc<TickCache> {
        &self.inner.ticks
    }

    pub fn bar_cache(&self) -> &BarCache {
        &self.inner.bars
    }

    pub fn tick_stats(&self) -> String {
        self.inner.ticks.stats()
    }

    pub fn bar_stats(&self) -> String {
        self.inner.bars.stats()
    }

    /// Bulk warm-up driver over this lake's tick chain.
    pub fn primer(&self) -> Result<CachePrimer, DataError> {
        CachePrimer::new(
            Arc::clone(&self.inner.ticks),
            self.inner.config.beginning_of_time,
            &self.inner.config.primer,
        )
    }

    /// Every tick of `symbol` in `[start, end]`, ascending.
    #[tracing::instrument(skip(self, visitor))]
    pub fn search(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        visitor: Option<TickVisitor>,
    ) -> Result<BoxSequence<Tick>, DataError> {
        let criteria = Criteria::new(start, end, self.inner.config.beginning_of_time, None)?;
        let days = paths_by_day(symbol, start, end)?;
        debug!(days = days.len(), "tick search planned");

        let ticks = Arc::clone(&self.inner.ticks);
        let hours = days
            .into_iter()
            .flat_map(|day| day.paths)
            .map(move |path| ticks.reader(&path, None).map(SequenceExt::boxed));
        let concat = Concat::new(hours).with_filter(move |tick: &Tick| criteria.contains(tick.time));

        Ok(Mapped::new(concat, move |tick: Tick| {
            if let Some(visit) = &visitor {
                visit(&tick);
            }
            tick
        })
        .boxed())
    }

    /// `period` bars of `symbol` whose start lies in the period-rounded
    /// `[start, end]`, ascending. Days missing from the bar chain are rebuilt
    /// from ticks; `tick_visitor` sees the ticks of those days.
    #[tracing::instrument(skip(self, bar_visitor, tick_visitor))]
    pub fn aggregate_from_ticks(
        &self,
        symbol: &str,
        period: Period,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bar_visitor: Option<BarVisitor>,
        tick_visitor: Option<TickVisitor>,
    ) -> Result<BoxSequence<Bar>, DataError> {
        let criteria = Criteria::new(start, end, self.inner.config.beginning_of_time, Some(period))?;
        let days = criteria.days.clone();

        let lake = Arc::clone(&self.inner);
        let owned_symbol = symbol.to_string();
        let per_day = days.into_iter().map(move |day| {
            let key = BarKey::new(owned_symbol.clone(), period, day);
            lake.bars
                .get_day(&key, tick_visitor.clone())
                .map(|bars| VecSequence::new(bars).boxed())
        });
        let trimmed = Concat::new(per_day).with_filter(move |bar: &Bar| criteria.contains(bar.start));

        let emitted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&emitted);
        let lake = Arc::clone(&self.inner);
        let symbol = symbol.to_string();
        Ok(Mapped::new(trimmed, move |bar: Bar| {
            counter.fetch_add(1, Ordering::Relaxed);
            if let Some(visit) = &bar_visitor {
                visit(&bar);
            }
            bar
        })
        .on_close(move || {
            info!(
                %symbol,
                %period,
                bars = emitted.load(Ordering::Relaxed),
                bar_cache = %lake.bars.stats(),
                tick_cache = %lake.ticks.stats(),
                "aggregation query closed"
            );
            Ok(())
        })
        .boxed())
    }

    fn bar_window(&self, symbol: &str, period: Period) -> WindowFetch<Bar> {
        let lake = self.clone();
        let symbol = symbol.to_string();
        Box::new(move |from, to| {
            let to = to.max(from + Duration::milliseconds(1));
            lake.aggregate_from_ticks(&symbol, period, from, to, None, None)?
                .collect_vec()
        })
    }

    /// The `count` most recent bars starting at or before `end`, ascending.
    /// Fewer only when the beginning of time is reached.
    #[tracing::instrument(skip(self))]
    pub fn bars_before(
        &self,
        symbol: &str,
        period: Period,
        end: DateTime<Utc>,
        count: usize,
    ) -> Result<BoxSequence<Bar>, DataError> {
        let floor = self.inner.config.beginning_of_time;
        if end < floor {
            return Err(DataError::invalid_range(floor, end, "end precedes beginning of time"));
        }
        Ok(BackwardExtension::new(
            self.bar_window(symbol, period),
            end,
            Duration::days(1),
            count,
            floor,
        )
        .boxed())
    }

    /// Up to `count` bars starting at or after `start`, ascending, looking no
    /// further than `horizon`.
    #[tracing::instrument(skip(self))]
    pub fn bars_after(
        &self,
        symbol: &str,
        period: Period,
        start: DateTime<Utc>,
        count: usize,
        horizon: DateTime<Utc>,
    ) -> Result<BoxSequence<Bar>, DataError> {
        let floor = self.inner.config.beginning_of_time;
        if start < floor {
            return Err(DataError::invalid_range(start, horizon, "start precedes beginning of time"));
        }
        if horizon < start {
            return Err(DataError::invalid_range(start, horizon, "horizon before start"));
        }
        Ok(ForwardExtension::new(
            self.bar_window(symbol, period),
            start,
            Duration::days(1),
            count,
            horizon,
        )
        .boxed())
    }
}
