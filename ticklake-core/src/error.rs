//! Structured error types for retrieval, decoding, caching and aggregation.
//!
//! Every fallible operation in the crate returns `Result<T, DataError>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid range [{start}, {end}]: {reason}")]
    InvalidRange {
        start: String,
        end: String,
        reason: String,
    },

    #[error("corrupt tick file {path}: {reason}")]
    DecodeCorruption { path: String, reason: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("provider busy: {0}")]
    ServerBusy(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("object store error: {0}")]
    ObjectStoreError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("sequence exhausted")]
    SequenceExhausted,

    #[error("primer error: {0}")]
    PrimerError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataError {
    pub(crate) fn invalid_range(
        start: impl ToString,
        end: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeCorruption {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure belongs to the server-busy class that direct fetch retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerBusy(_))
    }
}

impl From<object_store::Error> for DataError {
    fn from(err: object_store::Error) -> Self {
        Self::ObjectStoreError(err.to_string())
    }
}
