//! Stream identity and data provenance.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical ordered-sequence identity. The all-zero id is reserved for realtime data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub Uuid);

/// Backtest streams sort before realtime streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamKind {
    Backtest,
    Realtime,
}

impl StreamId {
    pub const REALTIME: StreamId = StreamId(Uuid::nil());

    /// Fresh backtest stream.
    pub fn backtest() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn kind(&self) -> StreamKind {
        if self.0.is_nil() {
            StreamKind::Realtime
        } else {
            StreamKind::Backtest
        }
    }

    pub fn is_realtime(&self) -> bool {
        self.kind() == StreamKind::Realtime
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::REALTIME
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a tick or bar came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Live,
    Historical,
}

impl Source {
    /// Historical contaminates live; combining equal sources is a no-op.
    pub fn combine(self, other: Source) -> Source {
        if self == other {
            self
        } else {
            Source::Historical
        }
    }
}
