//! Cache key derivation from request parameters
//!
//! A cache key identifies one fetchable resource instance. It is built from a
//! base identifier plus the request parameters sorted by name, so the same
//! parameter set always yields the same key no matter how it was assembled.

use std::collections::BTreeMap;
use std::fmt;

/// Request parameters, kept sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Creates an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a parameter, replacing any previous value for the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters as pairs, ready for a query string
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.iter().collect()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Canonical `name=value&...` form, names and values percent-encoded
impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(
                f,
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )?;
        }
        Ok(())
    }
}

/// Builds the cache key for `base` requested with `params`
///
/// Produces `<base>_<name1>=<value1>&<name2>=<value2>...` with names sorted.
/// Names and values are percent-encoded, so a value such as `1&b=2` cannot be
/// mistaken for a second parameter. Without parameters the key is `base`.
pub fn create_key_from_params(base: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        base.to_string()
    } else {
        format!("{}_{}", base, params)
    }
}
