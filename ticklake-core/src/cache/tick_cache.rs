use super::{read_through, render_stats, Layer};
use crate::codec::{TickReader, TickVisitor};
use crate::error::DataError;
use crate::fetch::DirectFetcher;
use crate::paths::HourPath;
use bytes::Bytes;
use std::io::Cursor;

/// Decoder over a fully retrieved hour file.
pub type HourReader = TickReader<Cursor<Bytes>>;

/// Hour-file chain: the configured layers, then the provider.
pub struct TickCache {
    layers: Vec<Layer>,
    fetcher: DirectFetcher,
}

impl TickCache {
    pub fn new(layers: Vec<Layer>, fetcher: DirectFetcher) -> Self {
        Self { layers, fetcher }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %path))]
    pub fn get(&self, path: &HourPath) -> Result<Bytes, DataError> {
        self.get_key(&path.key())
    }

    pub fn get_key(&self, key: &str) -> Result<Bytes, DataError> {
        read_through(&self.layers, key, |k| self.fetcher.fetch(k))
    }

    /// Retrieve the hour and wrap it in a lazy decoder.
    pub fn reader(
        &self,
        path: &HourPath,
        visitor: Option<TickVisitor>,
    ) -> Result<HourReader, DataError> {
        let data = self.get(path)?;
        Ok(TickReader::new(path, Cursor::new(data)).with_visitor(visitor))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn fetcher(&self) -> &DirectFetcher {
        &self.fetcher
    }

    pub fn stats(&self) -> String {
        render_stats(&self.layers, &self.fetcher.to_string())
    }
}
