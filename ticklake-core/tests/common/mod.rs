//! Shared helpers: synthetic hour files and a scripted provider.

#![allow(dead_code)]

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use ticklake_core::codec::{encode_hour, TickRecord};
use ticklake_core::fetch::{RateLimiter, Transport};
use ticklake_core::paths::HourPath;
use ticklake_core::{DataError, LakeConfig, TickLake};
use tracing_subscriber::EnvFilter;

pub const BASE_URL: &str = "https://feed.test/datafeed";
pub const SYMBOL: &str = "EURUSD";

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn hour_key(y: i32, mo: u32, d: u32, h: u32) -> String {
    HourPath::new(SYMBOL, at(y, mo, d, h, 0, 0)).key()
}

/// `n` records spread evenly over the hour.
pub fn spread_records(n: usize) -> Vec<TickRecord> {
    (0..n)
        .map(|i| TickRecord {
            offset_ms: (i as i64 * 3_600_000 / n as i64) as i32,
            ask: 116_712 + (i % 41) as i32,
            bid: 116_700 + (i % 37) as i32,
            ask_volume: 1.25,
            bid_volume: 0.75 + (i % 3) as f32,
        })
        .collect()
}

pub fn spread_hour(n: usize) -> Vec<u8> {
    encode_hour(&spread_records(n)).unwrap()
}

/// One tick at the top of every minute; bid rises by one point per minute.
pub fn minute_hour(base_bid: i32) -> Vec<u8> {
    let records: Vec<TickRecord> = (0..60)
        .map(|m| TickRecord {
            offset_ms: m * 60_000,
            ask: base_bid + m + 3,
            bid: base_bid + m,
            ask_volume: 1.0,
            bid_volume: 1.0,
        })
        .collect();
    encode_hour(&records).unwrap()
}

/// Provider stand-in. Unknown keys are served as empty hours.
#[derive(Default)]
pub struct ScriptedTransport {
    files: Mutex<HashMap<String, Bytes>>,
    busy: Mutex<HashMap<String, usize>>,
    missing: Mutex<HashSet<String>>,
    broken: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, key: impl Into<String>, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.into(), Bytes::from(data));
    }

    /// Answer `times` requests for `key` with a busy error first.
    pub fn busy_for(&self, key: impl Into<String>, times: usize) {
        self.busy.lock().unwrap().insert(key.into(), times);
    }

    pub fn missing(&self, key: impl Into<String>) {
        self.missing.lock().unwrap().insert(key.into());
    }

    /// Panic inside `get` for `key`, as a buggy transport would.
    pub fn panic_on(&self, key: impl Into<String>) {
        self.broken.lock().unwrap().insert(key.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<Bytes, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = url
            .strip_prefix(BASE_URL)
            .unwrap_or(url)
            .trim_start_matches('/')
            .to_string();
        self.requested.lock().unwrap().push(key.clone());

        let broken = self.broken.lock().unwrap().contains(&key);
        if broken {
            panic!("transport bug while fetching {key}");
        }

        if let Some(left) = self.busy.lock().unwrap().get_mut(&key) {
            if *left > 0 {
                *left -= 1;
                return Err(DataError::ServerBusy(format!("HTTP 503 for {url}")));
            }
        }
        if self.missing.lock().unwrap().contains(&key) {
            return Err(DataError::HttpStatus {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn test_config(cache_root: &Path) -> LakeConfig {
    let mut config = LakeConfig {
        cache_root: cache_root.to_path_buf(),
        ..LakeConfig::default()
    };
    config.fetch.base_url = BASE_URL.into();
    config.fetch.retry_base_delay_ms = 1;
    config.primer.threads = 4;
    config
}

/// Route library logs to the test harness; `RUST_LOG=ticklake_core=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn lake_with(
    config: LakeConfig,
    transport: Arc<ScriptedTransport>,
    store: Arc<dyn ObjectStore>,
) -> TickLake {
    init_tracing();
    TickLake::builder(config)
        .with_transport(transport)
        .with_rate_limiter(Arc::new(RateLimiter::unlimited()))
        .with_object_store(store)
        .build()
        .unwrap()
}

pub fn lake(cache_root: &Path, transport: Arc<ScriptedTransport>) -> TickLake {
    lake_with(test_config(cache_root), transport, Arc::new(InMemory::new()))
}
