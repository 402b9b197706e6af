//! Cached fetching of backend resources
//!
//! This module composes the cache store with asynchronous fetch operations:
//! a generic read-through resource (`CachedData`), its HTTP specialization
//! (`CachedApi`), and the catalogue of backend endpoints the charts use.

pub mod api;
pub mod cached;
pub mod endpoints;
mod error;

pub use api::{unwrap_envelope, ApiClient, CachedApi, CachedApiOptions, DEFAULT_BASE_URL};
pub use cached::{fetch_fn, CachedData, CachedDataOptions, FetchFn, FetchState};
pub use endpoints::{common_cache_keys, Endpoint, UnknownEndpoint};
pub use error::FetchError;
