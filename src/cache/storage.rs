//! Persistent key-value storage backends for the cache
//!
//! The cache store never talks to the filesystem directly. It goes through the
//! [`Storage`] trait, which mirrors the small surface of a browser-style
//! persistent storage API: get, set, remove and list keys.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

/// Key written and removed to probe whether a backend accepts writes
const PROBE_KEY: &str = "__storage_test__";

/// File extension used for file-backed entries
const FILE_EXTENSION: &str = "json";

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is disabled or otherwise not usable
    #[error("storage is unavailable")]
    Unavailable,

    /// Writing the value would exceed the backend's quota
    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Underlying filesystem error
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A persistent string key-value store
pub trait Storage: Send + Sync {
    /// Returns the raw value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every key currently stored
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Checks that the backend currently accepts writes
    fn is_available(&self) -> bool {
        self.set_item(PROBE_KEY, PROBE_KEY).is_ok() && self.remove_item(PROBE_KEY).is_ok()
    }
}

/// Stores each key as a JSON file in a directory
///
/// File names are the percent-encoded key plus a `.json` extension, so keys
/// containing path separators or query characters map to flat, reversible
/// names.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a file storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entry files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), FILE_EXTENSION))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension()? != FILE_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        urlencoding::decode(stem).ok().map(|key| key.into_owned())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            if let Some(key) = Self::key_for(&entry?.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process storage, used by tests and embedders without a disk
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
    unavailable: bool,
}

impl MemoryStorage {
    /// Creates an empty, unbounded memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory storage that rejects writes once the total size of
    /// keys and values would exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Creates a storage whose every operation fails, like disabled browser storage
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut items = self.items.write();

        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_available()?;
        Ok(self.items.read().keys().cloned().collect())
    }
}
