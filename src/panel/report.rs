//! Cache introspection over a list of keys
//!
//! Builds the per-key existence/age/size rows and the aggregate figures the
//! diagnostic panel and the `info` command display.

use std::io::{self, Write};

use crate::cache::{CacheInfo, CacheStore};

/// Introspection result for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReport {
    pub key: String,
    pub info: CacheInfo,
}

/// Introspection results for a caller-supplied list of keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheReport {
    entries: Vec<KeyReport>,
}

impl CacheReport {
    /// Inspects every key in `keys`, in order. Nothing is purged.
    pub fn collect<I, S>(store: &CacheStore, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = keys
            .into_iter()
            .map(|key| {
                let key = key.into();
                let info = store.cache_info(&key);
                KeyReport { key, info }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[KeyReport] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys with a stored entry
    pub fn cached_count(&self) -> usize {
        self.entries.iter().filter(|e| e.info.exists).count()
    }

    /// Combined size in bytes of the stored entries
    pub fn total_size(&self) -> usize {
        self.entries.iter().filter_map(|e| e.info.size).sum()
    }

    /// Marks `key` as no longer cached
    pub fn mark_removed(&mut self, key: &str) {
        for entry in self.entries.iter_mut().filter(|e| e.key == key) {
            entry.info = CacheInfo::default();
        }
    }

    /// Marks every key as no longer cached
    pub fn mark_all_removed(&mut self) {
        for entry in &mut self.entries {
            entry.info = CacheInfo::default();
        }
    }

    /// Writes one row per key followed by the summary line
    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let width = self
            .entries
            .iter()
            .map(|e| e.key.len())
            .max()
            .unwrap_or(0)
            .max("KEY".len());

        writeln!(out, "{:<width$}  {:>8}  {:>10}", "KEY", "AGE", "SIZE")?;
        for entry in &self.entries {
            if entry.info.exists {
                writeln!(
                    out,
                    "{:<width$}  {:>8}  {:>10}",
                    entry.key,
                    format_age(entry.info.age),
                    format_size(entry.info.size)
                )?;
            } else {
                writeln!(out, "{:<width$}  {:>8}  {:>10}", entry.key, "-", "Not cached")?;
            }
        }

        writeln!(
            out,
            "Cached items: {}/{}, total size: {}",
            self.cached_count(),
            self.len(),
            format_size(Some(self.total_size()))
        )
    }
}

/// Formats an age in milliseconds as `Nd Nh`, `Nh Nm` or `Nm`
pub fn format_age(age: Option<i64>) -> String {
    let Some(age) = age else {
        return "N/A".to_string();
    };

    let minutes = age.max(0) / 1000 / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Formats a byte count as `B`, `KB` or `MB`
pub fn format_size(size: Option<usize>) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;

    match size {
        None => "N/A".to_string(),
        Some(size) if size < KB => format!("{} B", size),
        Some(size) if size < MB => format!("{:.1} KB", size as f64 / KB as f64),
        Some(size) => format!("{:.1} MB", size as f64 / MB as f64),
    }
}

/// Human-readable label for a cache key
pub fn display_name(key: &str) -> String {
    key.trim_start_matches('/').replace('_', " ")
}
