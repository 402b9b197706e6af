//! JSON API client and the cached API resource
//!
//! `ApiClient` performs `GET <base><endpoint>?<params>` against the statistics
//! backend. `CachedApi` binds a client, an endpoint and a parameter set to a
//! [`CachedData`] whose cache key is derived from the parameters.

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::cached::{CachedData, CachedDataOptions, ErrorCallback, FetchState, SuccessCallback};
use super::FetchError;
use crate::cache::{create_key_from_params, CacheConfig, CacheInfo, CacheStore, QueryParams};

/// Base URL of the statistics backend when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client for the statistics backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClient {
    /// Create a new ApiClient for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a new ApiClient with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `endpoint`, without query parameters
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Fetch `endpoint` with `params` and decode the payload
    ///
    /// # Returns
    /// * `Ok(T)` - The payload, unwrapped from a `{"data": ...}` envelope if present
    /// * `Err(FetchError::Status)` - If the server answered with a non-2xx status
    /// * `Err(FetchError)` - If the request or parsing fails
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<T, FetchError> {
        let url = self.url(endpoint);
        debug!(%url, params = %params, "fetching");

        let response = self.client.get(&url).query(&params.pairs()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        Ok(serde_json::from_value(unwrap_envelope(body))?)
    }
}

/// Returns the `data` field of an object that has a non-null one, otherwise the body itself
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Overrides for a [`CachedApi`]
pub struct CachedApiOptions<T> {
    /// Defaults to [`CacheConfig::charts`]
    pub cache_config: Option<CacheConfig>,
    pub skip_cache: bool,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
}

impl<T> Default for CachedApiOptions<T> {
    fn default() -> Self {
        Self {
            cache_config: None,
            skip_cache: false,
            on_success: None,
            on_error: None,
        }
    }
}

/// A backend endpoint viewed through the cache
///
/// The cache key is `create_key_from_params(endpoint, params)`, so each
/// distinct parameter set has its own entry.
pub struct CachedApi<T> {
    client: ApiClient,
    endpoint: String,
    overrides: CachedApiOptions<T>,
    resource: CachedData<T>,
}

impl<T> CachedApi<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        store: CacheStore,
        client: ApiClient,
        endpoint: impl Into<String>,
        params: QueryParams,
    ) -> Self {
        Self::with_options(store, client, endpoint, params, CachedApiOptions::default())
    }

    pub fn with_options(
        store: CacheStore,
        client: ApiClient,
        endpoint: impl Into<String>,
        params: QueryParams,
        overrides: CachedApiOptions<T>,
    ) -> Self {
        let endpoint = endpoint.into();
        let options = Self::options_for(&client, &endpoint, params, &overrides);
        Self {
            resource: CachedData::new(store, options),
            client,
            endpoint,
            overrides,
        }
    }

    fn options_for(
        client: &ApiClient,
        endpoint: &str,
        params: QueryParams,
        overrides: &CachedApiOptions<T>,
    ) -> CachedDataOptions<T> {
        let key = create_key_from_params(endpoint, &params);
        let dependencies = [endpoint.to_string(), params.to_string()];

        let client = client.clone();
        let path = endpoint.to_string();
        let mut options = CachedDataOptions::new(key, move || {
            let client = client.clone();
            let path = path.clone();
            let params = params.clone();
            async move { client.get_json::<T>(&path, &params).await }
        })
        .with_config(
            overrides
                .cache_config
                .clone()
                .unwrap_or_else(CacheConfig::charts),
        )
        .with_dependencies(dependencies)
        .skip_cache(overrides.skip_cache);
        options.on_success = overrides.on_success.clone();
        options.on_error = overrides.on_error.clone();
        options
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn load(&self) -> FetchState<T> {
        self.resource.load().await
    }

    pub async fn refetch(&self) -> FetchState<T> {
        self.resource.refetch().await
    }

    /// Switches to a new parameter set, reloading if it differs from the current one
    pub async fn set_params(&self, params: QueryParams) -> bool {
        let options = Self::options_for(&self.client, &self.endpoint, params, &self.overrides);
        self.resource.update(options).await
    }

    pub fn state(&self) -> FetchState<T> {
        self.resource.state()
    }

    pub fn data(&self) -> Option<T> {
        self.resource.data()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.resource.error()
    }

    pub fn last_fetch(&self) -> i64 {
        self.resource.last_fetch()
    }

    pub fn cache_key(&self) -> String {
        self.resource.cache_key()
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.resource.cache_info()
    }
}
