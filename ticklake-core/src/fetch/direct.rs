use super::rate_limit::RateLimiter;
use super::transport::Transport;
use crate::cache::counters::{CounterSnapshot, TierCounters};
use crate::config::FetchConfig;
use crate::error::DataError;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a single backoff sleep.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Last link of every cache chain: a paced, retrying fetch from the provider.
pub struct DirectFetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
    counters: TierCounters,
}

impl DirectFetcher {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>, config: &FetchConfig) -> Self {
        Self {
            transport,
            limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            counters: TierCounters::default(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    /// Fetch `key`. Counts one retrieve however many attempts it takes.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn fetch(&self, key: &str) -> Result<Bytes, DataError> {
        self.counters.record_retrieve();
        let url = self.url_for(key);

        let mut attempt = 0u32;
        loop {
            self.limiter.acquire();
            match self.transport.get(&url) {
                Ok(body) => {
                    debug!(%url, bytes = body.len(), attempt, "fetched");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    self.counters.record_retry();
                    let delay = backoff_delay(self.base_delay, attempt);
                    warn!(%url, attempt, error = %e, delay_ms = delay.as_millis() as u64, "provider busy; retrying");
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

impl fmt::Display for DirectFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.counters.snapshot();
        write!(f, "direct: retrieved={} retries={}", s.retrieves, s.retries)
    }
}
