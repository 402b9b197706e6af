//! Cache module for persisting API responses
//!
//! This module provides a versioned, TTL-based cache over a pluggable
//! persistent key-value storage. Entries live under a reserved key prefix so
//! the cache can share its storage with unrelated data, and cache keys are
//! derived canonically from request parameters.

mod clock;
mod keys;
mod manager;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keys::{create_key_from_params, QueryParams};
pub use manager::{
    CacheConfig, CacheEntry, CacheInfo, CacheStore, CacheSummary, CACHE_PREFIX, DEFAULT_VERSION,
};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
