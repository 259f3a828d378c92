//! Bulk cache warm-up.
//!
//! One task per hour file is pushed through the tick chain on a fixed-size
//! worker pool. A failing task is logged and tallied; it never cancels its
//! siblings or the batch.

use crate::cache::TickCache;
use crate::config::PrimerConfig;
use crate::error::DataError;
use crate::paths::hour_paths;
use chrono::{DateTime, Utc};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

/// Outcome of one load batch.
#[derive(Debug, Default)]
pub struct PrimeSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed hour keys with their errors.
    pub errors: Vec<(String, DataError)>,
}

impl PrimeSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Default)]
struct Progress {
    outstanding: usize,
    summary: PrimeSummary,
}

#[derive(Default)]
struct Shared {
    progress: Mutex<Progress>,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, key: String, result: Result<(), DataError>) {
        let mut progress = self.lock();
        match result {
            Ok(()) => progress.summary.succeeded += 1,
            Err(e) => {
                error!(%key, error = %e, "primer task failed");
                progress.summary.failed += 1;
                progress.summary.errors.push((key, e));
            }
        }
        progress.outstanding -= 1;
        if progress.outstanding == 0 {
            self.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

pub struct CachePrimer {
    ticks: Arc<TickCache>,
    floor: DateTime<Utc>,
    pool: ThreadPool,
    shared: Arc<Shared>,
}

impl CachePrimer {
    pub fn new(
        ticks: Arc<TickCache>,
        floor: DateTime<Utc>,
        config: &PrimerConfig,
    ) -> Result<Self, DataError> {
        let threads = config.resolved_threads();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("primer-{i}"))
            .build()
            .map_err(|e| DataError::PrimerError(format!("worker pool: {e}")))?;
        info!(threads, "cache primer started");
        Ok(Self {
            ticks,
            floor,
            pool,
            shared: Arc::new(Shared::default()),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Start a fresh batch. Fails while the previous one is still running.
    pub fn new_load(&self) -> Result<(), DataError> {
        let mut progress = self.shared.lock();
        if progress.outstanding > 0 {
            return Err(DataError::PrimerError(format!(
                "{} tasks of the previous load are still running",
                progress.outstanding
            )));
        }
        progress.summary = PrimeSummary::default();
        Ok(())
    }

    /// Queue every hour of `symbol` in `[start, end]`. Returns the number of tasks.
    #[tracing::instrument(skip(self))]
    pub fn load(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, DataError> {
        if start < self.floor {
            return Err(DataError::invalid_range(
                start,
                end,
                format!("start precedes beginning of time {}", self.floor),
            ));
        }
        let paths = hour_paths(symbol, start, end)?;
        let submitted = paths.len();
        {
            let mut progress = self.shared.lock();
            progress.outstanding += submitted;
            progress.summary.submitted += submitted;
        }

        for path in paths {
            let ticks = Arc::clone(&self.ticks);
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || {
                let key = path.key();
                let result = panic::catch_unwind(AssertUnwindSafe(|| ticks.get(&path).map(|_| ())))
                    .unwrap_or_else(|payload| {
                        Err(DataError::PrimerError(format!(
                            "task for {key} panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                shared.finish(key, result);
            });
        }
        info!(symbol, files = submitted, "primer load queued");
        Ok(submitted)
    }

    /// Block until every queued task has finished; hands back the batch summary.
    pub fn wait_for_completion(&self) -> PrimeSummary {
        let mut progress = self.shared.lock();
        while progress.outstanding > 0 {
            progress = self
                .shared
                .idle
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let summary = std::mem::take(&mut progress.summary);
        info!(
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "primer batch complete"
        );
        summary
    }

    /// Drain outstanding work and stop the workers.
    pub fn shutdown(self) -> PrimeSummary {
        let summary = self.wait_for_completion();
        drop(self.pool);
        summary
    }
}
