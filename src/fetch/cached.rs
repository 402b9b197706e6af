//! Read-through cached fetching for a single logical resource
//!
//! `CachedData` checks the cache store for a fresh entry and only invokes the
//! supplied fetch function on a miss, writing the result back for the next
//! reader. It exposes load, error and freshness state for rendering code.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::FetchError;
use crate::cache::{CacheConfig, CacheInfo, CacheStore};

/// Zero-argument asynchronous fetch operation
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

/// Called with the resolved value, from the cache or a live fetch
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Called when a live fetch fails
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

/// Wraps an async closure as a [`FetchFn`]
pub fn fetch_fn<T, F, Fut>(f: F) -> FetchFn<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// What to fetch, how to cache it and when to re-run
pub struct CachedDataOptions<T> {
    /// Logical cache key of the resource
    pub cache_key: String,
    /// Duration/version policy; the store default applies when `None`
    pub cache_config: Option<CacheConfig>,
    /// Live fetch used on a miss or a forced refetch
    pub fetch: FetchFn<T>,
    /// A change in this list between updates triggers a reload
    pub dependencies: Vec<String>,
    /// Always fetch live and never touch the store
    pub skip_cache: bool,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
}

impl<T> Clone for CachedDataOptions<T> {
    fn clone(&self) -> Self {
        Self {
            cache_key: self.cache_key.clone(),
            cache_config: self.cache_config.clone(),
            fetch: Arc::clone(&self.fetch),
            dependencies: self.dependencies.clone(),
            skip_cache: self.skip_cache,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T: 'static> CachedDataOptions<T> {
    pub fn new<F, Fut>(cache_key: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self::with_fetch_fn(cache_key, fetch_fn(fetch))
    }

    pub fn with_fetch_fn(cache_key: impl Into<String>, fetch: FetchFn<T>) -> Self {
        Self {
            cache_key: cache_key.into(),
            cache_config: None,
            fetch,
            dependencies: Vec::new(),
            skip_cache: false,
            on_success: None,
            on_error: None,
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = Some(config);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// Observable state of a cached resource
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last resolved value
    pub data: Option<T>,
    /// True from the start of a cycle until it settles
    pub loading: bool,
    /// Message of the last failed fetch, cleared when a new cycle starts
    pub error: Option<String>,
    /// Milliseconds since the epoch of the last successful resolution, 0 before any
    pub last_fetch: i64,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            last_fetch: 0,
        }
    }
}

/// A cache-backed view of one fetchable resource
///
/// Each `load` or `refetch` starts a cycle numbered by a monotonically
/// increasing generation. A live fetch that settles after a newer cycle has
/// started is dropped: it updates neither the state, the store nor the
/// callbacks. Only the latest cycle is ever observable.
///
/// `loading` is cleared by whichever cycle settles last. A cycle whose future
/// is dropped mid-fetch counts as settled, so abandoning a `load` never
/// leaves the resource loading forever.
pub struct CachedData<T> {
    store: CacheStore,
    options: Mutex<CachedDataOptions<T>>,
    state: Mutex<FetchState<T>>,
    generation: AtomicU64,
    running: AtomicUsize,
}

/// Marks one cycle as running until it is dropped
struct CycleGuard<'a, T> {
    running: &'a AtomicUsize,
    state: &'a Mutex<FetchState<T>>,
}

impl<T> Drop for CycleGuard<'_, T> {
    fn drop(&mut self) {
        if self.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.lock().loading = false;
        }
    }
}

impl<T> CachedData<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Creates the resource without loading it
    pub fn new(store: CacheStore, options: CachedDataOptions<T>) -> Self {
        Self {
            store,
            options: Mutex::new(options),
            state: Mutex::new(FetchState::default()),
            generation: AtomicU64::new(0),
            running: AtomicUsize::new(0),
        }
    }

    /// Creates the resource and runs the first load
    pub async fn mount(store: CacheStore, options: CachedDataOptions<T>) -> Self {
        let resource = Self::new(store, options);
        resource.load().await;
        resource
    }

    /// Serves a fresh cache entry if there is one, otherwise fetches and caches
    pub async fn load(&self) -> FetchState<T> {
        self.run(true).await
    }

    /// Fetches live, ignoring any cached entry, and writes the result back
    pub async fn refetch(&self) -> FetchState<T> {
        self.run(false).await
    }

    /// Rebinds key, fetch function and policy
    ///
    /// Reloads only when the dependency list differs from the previous one
    /// and returns whether it did.
    pub async fn update(&self, options: CachedDataOptions<T>) -> bool {
        let changed = {
            let mut current = self.options.lock();
            let changed = current.dependencies != options.dependencies;
            *current = options;
            changed
        };

        if changed {
            self.load().await;
        }
        changed
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.lock().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.lock().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn last_fetch(&self) -> i64 {
        self.state.lock().last_fetch
    }

    pub fn cache_key(&self) -> String {
        self.options.lock().cache_key.clone()
    }

    /// Presence, age and size of the current key's cache entry
    pub fn cache_info(&self) -> CacheInfo {
        self.store.cache_info(&self.cache_key())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(&self, use_cache: bool) -> FetchState<T> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.fetch_add(1, Ordering::SeqCst);
        let guard = CycleGuard {
            running: &self.running,
            state: &self.state,
        };
        let options = self.options.lock().clone();
        let key = options.cache_key.as_str();

        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        if use_cache && !options.skip_cache {
            if let Some(cached) = self.store.get::<T>(key, options.cache_config.as_ref()) {
                debug!(key, "cache hit");
                self.resolve(&options, cached);
                return self.state();
            }
            debug!(key, "cache miss");
        }

        let result = (options.fetch)().await;

        if !self.is_current(generation) {
            debug!(key, generation, "discarding superseded fetch result");
            drop(guard);
            return self.state();
        }

        match result {
            Ok(fresh) => {
                if !options.skip_cache {
                    self.store.set(key, &fresh, options.cache_config.as_ref());
                }
                self.resolve(&options, fresh);
            }
            Err(err) => {
                warn!(key, error = %err, "fetch failed");
                {
                    let mut state = self.state.lock();
                    state.error = Some(err.to_string());
                    state.loading = false;
                }
                if let Some(on_error) = &options.on_error {
                    on_error(&err);
                }
            }
        }

        self.state()
    }

    fn resolve(&self, options: &CachedDataOptions<T>, data: T) {
        {
            let mut state = self.state.lock();
            state.data = Some(data.clone());
            state.last_fetch = self.store.now_millis();
            state.loading = false;
        }
        if let Some(on_success) = &options.on_success {
            on_success(&data);
        }
    }
}
