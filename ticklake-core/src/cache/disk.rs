//! Durable local tier.
//!
//! Keys map verbatim to files beneath the root, so the directory mirrors the
//! provider's layout. Writes are atomic: write a uniquely named temporary
//! sibling, then rename it into place.

use crate::error::DataError;
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, DataError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(DataError::CacheError(format!(
                "cache key {key:?} is not a relative path"
            )));
        }
        Ok(self.root.join(relative))
    }

    pub fn check(&self, key: &str) -> Result<Option<Bytes>, DataError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DataError::CacheError(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn save(&self, key: &str, data: &Bytes) -> Result<(), DataError> {
        let path = self.path_for(key)?;
        replace_with(&path, |file| file.write_all(data))
    }
}

/// Atomically replace `path` with whatever `write` produces. The temporary
/// sibling is removed on every failure path.
fn replace_with<F>(path: &Path, write: F) -> Result<(), DataError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            DataError::CacheError(format!("create {}: {e}", parent.display()))
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp_path = path.with_file_name(tmp_name);

    let written = File::create(&tmp_path).and_then(|mut file| write(&mut file));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(DataError::CacheError(format!(
            "write {}: {e}",
            tmp_path.display()
        )));
    }
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::CacheError(format!("atomic rename failed: {e}"))
    })
}
