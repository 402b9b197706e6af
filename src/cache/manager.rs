//! Versioned, TTL-aware cache store over a persistent key-value backend
//!
//! Provides a `CacheStore` that serializes values as JSON records carrying a
//! creation timestamp and a version tag. Every operation degrades to a
//! miss/`false` when the backend misbehaves; caching is an optimization and
//! never a reason to fail a request.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::storage::Storage;

/// Prefix reserving this cache's keys inside the shared storage
pub const CACHE_PREFIX: &str = "deadball_cache_";

/// Version tag used when the caller does not supply one
pub const DEFAULT_VERSION: &str = "1.0";

/// A persisted cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Schema/content version the payload was written with
    pub version: String,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still usable under `config` at time `now`
    ///
    /// An entry is stale once its age exceeds the configured duration, or as
    /// soon as its version differs from the requested one. An age that is
    /// negative or not representable also counts as stale.
    pub fn is_fresh(&self, now: i64, config: &CacheConfig) -> bool {
        let max_age = config.duration.num_milliseconds();
        let within_ttl = matches!(
            now.checked_sub(self.timestamp),
            Some(age) if (0..=max_age).contains(&age)
        );
        within_ttl && self.version == config.version
    }
}

/// Per-access cache policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry stays fresh
    pub duration: Duration,
    /// Entries written with a different version are treated as absent
    pub version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            duration: Duration::hours(24),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl CacheConfig {
    /// Policy for chart payloads: 6 hours, version 2.1
    pub fn charts() -> Self {
        Self {
            duration: Duration::hours(6),
            version: "2.1".to_string(),
        }
    }

    /// Policy for raw data payloads: 24 hours, version 2.1
    pub fn data() -> Self {
        Self {
            duration: Duration::hours(24),
            version: "2.1".to_string(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Non-destructive view of one cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheInfo {
    /// Whether a parseable entry is stored under the key
    pub exists: bool,
    /// Milliseconds since the entry was written
    pub age: Option<i64>,
    /// Serialized size of the entry in bytes
    pub size: Option<usize>,
}

/// Aggregate over every stored entry younger than a given age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheSummary {
    pub count: usize,
    pub total_size: usize,
}

/// Handle to the cache namespace inside a [`Storage`] backend
///
/// Cloning is cheap and every clone addresses the same namespace. The store
/// keeps no policy of its own: duration and version come with each call.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a store over `storage` using wall-clock time
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            prefix: CACHE_PREFIX.to_string(),
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the reserved key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current time according to the store's clock
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn available(&self) -> bool {
        let available = self.storage.is_available();
        if !available {
            warn!("cache storage is unavailable");
        }
        available
    }

    /// Reads a fresh entry for `key`
    ///
    /// Returns `None` when the entry is missing, unparseable, older than the
    /// configured duration or written under another version. Corrupt, stale
    /// and mismatched entries are removed on the way out. The returned value
    /// is an owned copy that callers may mutate.
    pub fn get<T: DeserializeOwned>(&self, key: &str, config: Option<&CacheConfig>) -> Option<T> {
        if !self.available() {
            return None;
        }

        let raw = match self.storage.get_item(&self.full_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read cache");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable cache entry");
                self.remove(key);
                return None;
            }
        };

        let default_config = CacheConfig::default();
        let config = config.unwrap_or(&default_config);
        if !entry.is_fresh(self.now_millis(), config) {
            debug!(key, version = %entry.version, "discarding stale cache entry");
            self.remove(key);
            return None;
        }

        Some(entry.data)
    }

    /// Writes `data` under `key`, stamped with the current time and the config's version
    ///
    /// Returns `false` when the backend is unavailable or rejects the write.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, config: Option<&CacheConfig>) -> bool {
        if !self.available() {
            return false;
        }

        let entry = CacheEntry {
            data,
            timestamp: self.now_millis(),
            version: config
                .map(|c| c.version.clone())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache entry");
                return false;
            }
        };

        match self.storage.set_item(&self.full_key(key), &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "failed to save cache");
                false
            }
        }
    }

    /// Deletes the entry for `key`. Deleting an absent entry succeeds.
    pub fn remove(&self, key: &str) -> bool {
        if !self.available() {
            return false;
        }

        match self.storage.remove_item(&self.full_key(key)) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "failed to remove cache");
                false
            }
        }
    }

    /// Deletes every entry under the reserved prefix, leaving other keys alone
    pub fn clear(&self) -> bool {
        if !self.available() {
            return false;
        }

        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list cache keys");
                return false;
            }
        };

        for key in keys.iter().filter(|k| k.starts_with(&self.prefix)) {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(key = %key, error = %e, "failed to clear cache");
                return false;
            }
        }
        true
    }

    /// Reports presence, age and size of the entry for `key`
    ///
    /// Unlike [`CacheStore::get`] this never removes anything, even entries
    /// that are expired.
    pub fn cache_info(&self, key: &str) -> CacheInfo {
        if !self.storage.is_available() {
            return CacheInfo::default();
        }

        match self.storage.get_item(&self.full_key(key)) {
            Ok(Some(raw)) => self.inspect(&raw).unwrap_or_default(),
            _ => CacheInfo::default(),
        }
    }

    fn inspect(&self, raw: &str) -> Option<CacheInfo> {
        let entry: CacheEntry<IgnoredAny> = serde_json::from_str(raw).ok()?;
        Some(CacheInfo {
            exists: true,
            age: Some(self.now_millis().saturating_sub(entry.timestamp)),
            size: Some(raw.len()),
        })
    }

    /// Logical keys (prefix stripped) of every stored entry
    pub fn keys(&self) -> Vec<String> {
        match self.storage.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to list cache keys");
                Vec::new()
            }
        }
    }

    /// Counts entries younger than `max_age` and sums their sizes
    ///
    /// Unreadable entries are skipped, not removed.
    pub fn summary(&self, max_age: Duration) -> CacheSummary {
        let max_age = max_age.num_milliseconds();
        self.keys()
            .iter()
            .map(|key| self.cache_info(key))
            .filter(|info| {
                info.exists && info.age.is_some_and(|age| (0..max_age).contains(&age))
            })
            .fold(CacheSummary::default(), |summary, info| CacheSummary {
                count: summary.count + 1,
                total_size: summary.total_size + info.size.unwrap_or(0),
            })
    }
}
