//! Lake configuration.
//!
//! Stored as TOML. Every field has a default, so an empty file is a valid
//! configuration pointing at the public provider with a local disk cache.

use crate::error::DataError;
use chrono::{DateTime, Utc};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 2003-05-05T00:00:00Z, the first hour the provider serves.
pub fn provider_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_052_092_800, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LakeConfig {
    /// Root of the disk tier. Keys are mirrored verbatim beneath it.
    pub cache_root: PathBuf,
    /// Queries starting before this instant are rejected.
    pub beginning_of_time: DateTime<Utc>,
    pub fetch: FetchConfig,
    pub object_store: Option<ObjectStoreConfig>,
    pub primer: PrimerConfig,
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("./tick-cache"),
            beginning_of_time: provider_epoch(),
            fetch: FetchConfig::default(),
            object_store: None,
            primer: PrimerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub rate_limit_per_sec: f64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datafeed.dukascopy.com/datafeed".into(),
            rate_limit_per_sec: 2.0,
            max_retries: 3,
            retry_base_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

/// Shared remote tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    Local { root: PathBuf },
    Memory,
}

impl ObjectStoreConfig {
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>, DataError> {
        match self {
            Self::Local { root } => {
                std::fs::create_dir_all(root)?;
                Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
            }
            Self::Memory => Ok(Arc::new(InMemory::new())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimerConfig {
    /// Worker threads; 0 means one per available core.
    pub threads: usize,
}

impl PrimerConfig {
    pub fn resolved_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

impl LakeConfig {
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::ConfigError(format!("read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DataError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DataError::ConfigError(format!("parse lake TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if !(self.fetch.rate_limit_per_sec > 0.0) {
            return Err(DataError::ConfigError(format!(
                "fetch.rate_limit_per_sec must be positive, got {}",
                self.fetch.rate_limit_per_sec
            )));
        }
        if self.fetch.base_url.trim().is_empty() {
            return Err(DataError::ConfigError("fetch.base_url is empty".into()));
        }
        Ok(())
    }
}
