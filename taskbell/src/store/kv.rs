//! Key-value persistence backends.
//!
//! Defines the [`KeyValueStore`] trait the task store and the reminder
//! preference are persisted through, plus two implementations:
//! - [`FileKv`]: one file per key under a data directory
//! - [`MemoryKv`]: in-memory map for tests and embedding

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Errors that can occur in a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The key cannot be mapped onto the backend.
    #[error("invalid key `{0}`")]
    InvalidKey(String),

    /// A read failed for a reason other than the key being absent.
    #[error("failed to read `{path}`: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A write failed.
    #[error("failed to write `{path}`: {source}")]
    Write {
        /// File that was written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A string-to-string persistent map.
///
/// `get` returns `Ok(None)` for an absent key; errors are reserved for
/// backend failures.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// File-backed store: each key is a file inside `dir`.
///
/// Writes go to a sibling temp file first and are then renamed over the
/// target, so a reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory values are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if valid {
            Ok(self.dir.join(key))
        } else {
            Err(KvError::InvalidKey(key.to_string()))
        }
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KvError::Read { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| KvError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let tmp = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, value).map_err(|source| KvError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| KvError::Write { path, source })
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let kv = Self::new();
        kv.entries.lock().insert(key.to_string(), value.to_string());
        kv
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
