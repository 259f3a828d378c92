//! Shared object-store tier.
//!
//! The cache is synchronous, so the store's async API is driven from a small
//! private runtime. Existence check and put are separate calls; `save` runs
//! both inside a tier-local critical section so concurrent primer tasks never
//! write the same object twice.

use crate::error::DataError;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
    write_lock: Mutex<()>,
}

impl RemoteStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Result<Self, DataError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("ticklake-remote")
            .enable_all()
            .build()?;
        Ok(Self {
            store,
            runtime,
            write_lock: Mutex::new(()),
        })
    }

    fn location(key: &str) -> Result<ObjectPath, DataError> {
        ObjectPath::parse(key)
            .map_err(|e| DataError::ObjectStoreError(format!("bad object key {key:?}: {e}")))
    }

    pub fn check(&self, key: &str) -> Result<Option<Bytes>, DataError> {
        let location = Self::location(key)?;
        self.runtime.block_on(async {
            match self.store.get(&location).await {
                Ok(result) => result.bytes().await.map(Some).map_err(DataError::from),
                Err(object_store::Error::NotFound { .. }) => Ok(None),
                Err(e) => Err(DataError::from(e)),
            }
        })
    }

    fn exists(&self, location: &ObjectPath) -> Result<bool, DataError> {
        self.runtime.block_on(async {
            match self.store.head(location).await {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(e) => Err(DataError::from(e)),
            }
        })
    }

    /// Put `data` unless the object already exists.
    pub fn save(&self, key: &str, data: &Bytes) -> Result<(), DataError> {
        let location = Self::location(key)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.exists(&location)? {
            debug!(key, "object already present; skipping put");
            return Ok(());
        }
        self.runtime.block_on(async {
            self.store
                .put(&location, PutPayload::from(data.clone()))
                .await
        })?;
        Ok(())
    }
}
