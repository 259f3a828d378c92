//! Process-wide request pacing for the provider.
//!
//! Permits are handed out at a fixed interval (`1 / permits_per_sec`). A
//! caller that arrives early sleeps until its slot. Construct once and share
//! through an `Arc`; the limiter lives as long as its last holder.

use crate::error::DataError;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_free: Mutex<Instant>,
}

impl RateLimiter {
    pub const DEFAULT_PERMITS_PER_SEC: f64 = 2.0;

    pub fn new(permits_per_sec: f64) -> Result<Self, DataError> {
        if !(permits_per_sec.is_finite() && permits_per_sec > 0.0) {
            return Err(DataError::ConfigError(format!(
                "rate limit must be a positive number of permits per second, got {permits_per_sec}"
            )));
        }
        Ok(Self {
            interval: Duration::from_secs_f64(1.0 / permits_per_sec),
            next_free: Mutex::new(Instant::now()),
        })
    }

    /// No pacing at all.
    pub fn unlimited() -> Self {
        Self {
            interval: Duration::ZERO,
            next_free: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until a permit is available. Returns how long the caller waited.
    pub fn acquire(&self) -> Duration {
        let wait = {
            let mut next_free = self
                .next_free
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = (*next_free).max(now);
            *next_free = slot + self.interval;
            slot - now
        };
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        wait
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            next_free: Mutex::new(Instant::now()),
        }
    }
}
