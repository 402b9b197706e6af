//! Command-line interface parsing for the deadball cache tool
//!
//! This module handles parsing of CLI arguments using clap and resolves them,
//! together with environment variables and platform defaults, into the
//! `Settings` the binary runs with.

use std::path::PathBuf;

use chrono::Duration;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use thiserror::Error;

use crate::cache::{CacheConfig, QueryParams};
use crate::fetch::{Endpoint, DEFAULT_BASE_URL};
use crate::logging::LoggingConfig;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A query parameter was not given as `name=value`
    #[error("Invalid parameter: '{0}'. Expected name=value")]
    InvalidParam(String),

    /// The endpoint name is not recognized
    #[error("Unknown endpoint: '{0}'. Valid endpoints: drag_vs_hr, exit_velocity_distance, expected_vs_actual_distance, pitch_vs_exit_velocity, drag_coefficient_stats")]
    UnknownEndpoint(String),

    /// No cache directory was given and none could be derived
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// Deadball - cached access to juiced vs. dead ball statistics
#[derive(Parser, Debug)]
#[command(name = "deadball")]
#[command(about = "Cached access to juiced vs. dead ball statistics")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache entries
    #[arg(long, global = true, env = "DEADBALL_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Base URL of the statistics API
    #[arg(long, global = true, env = "DEADBALL_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch an endpoint through the cache and print its JSON payload
    ///
    /// Examples:
    ///   deadball fetch drag_vs_hr                     # monthly data
    ///   deadball fetch drag_vs_hr -p granularity=year
    ///   deadball fetch expected_vs_actual_distance --refresh
    Fetch {
        /// Endpoint name, e.g. drag_vs_hr
        endpoint: String,

        /// Query parameter as name=value, overriding the endpoint default (repeatable)
        #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Always fetch live and leave the cache untouched
        #[arg(long)]
        skip_cache: bool,

        /// Ignore any cached entry but store the fresh result
        #[arg(long)]
        refresh: bool,

        /// Version tag entries must carry to count as fresh
        #[arg(long, value_name = "VERSION")]
        cache_version: Option<String>,

        /// Minutes an entry stays fresh
        #[arg(long, value_name = "MINUTES")]
        ttl_minutes: Option<u32>,
    },

    /// Show existence, age and size of cache entries (all stored keys by default)
    Info {
        /// Cache keys to inspect
        keys: Vec<String>,
    },

    /// Remove one cache entry
    Remove {
        /// Cache key to remove
        key: String,
    },

    /// Remove every cache entry
    Clear,

    /// Open the interactive cache panel (well-known keys by default)
    Panel {
        /// Cache keys to watch
        keys: Vec<String>,
    },
}

/// Runtime configuration derived from CLI arguments and the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub api_url: String,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Resolves settings, falling back to the XDG cache directory
    ///
    /// # Returns
    /// * `Ok(Settings)` with every value resolved
    /// * `Err(CliError::NoCacheDir)` if no cache directory could be determined
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or(CliError::NoCacheDir)?,
        };

        Ok(Settings {
            cache_dir,
            api_url: cli.api_url.clone(),
            logging: LoggingConfig {
                level: cli.log_level.clone(),
                json: cli.log_json,
            },
        })
    }
}

/// XDG-compliant cache directory (`~/.cache/deadball/` on Linux)
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "deadball").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// A fully resolved `fetch` invocation
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub endpoint: Endpoint,
    pub params: QueryParams,
    pub config: CacheConfig,
    pub skip_cache: bool,
    pub refresh: bool,
}

impl FetchRequest {
    /// Builds the request for a `fetch` subcommand
    ///
    /// Parameters start from the endpoint's defaults and are overridden by
    /// the given ones. The cache policy starts from the chart policy.
    pub fn from_command(command: &Command) -> Result<Option<Self>, CliError> {
        let Command::Fetch {
            endpoint,
            params,
            skip_cache,
            refresh,
            cache_version,
            ttl_minutes,
        } = command
        else {
            return Ok(None);
        };

        let endpoint = parse_endpoint_arg(endpoint)?;
        let mut query = endpoint.default_params();
        for param in params {
            let (name, value) = parse_param_arg(param)?;
            query.insert(name, value);
        }

        let mut config = CacheConfig::charts();
        if let Some(version) = cache_version {
            config = config.with_version(version.clone());
        }
        if let Some(minutes) = ttl_minutes {
            config = config.with_duration(Duration::minutes(i64::from(*minutes)));
        }

        Ok(Some(FetchRequest {
            endpoint,
            params: query,
            config,
            skip_cache: *skip_cache,
            refresh: *refresh,
        }))
    }
}

/// Parses a `name=value` argument into its parts
///
/// Only the first `=` separates; the value may contain further `=` signs.
pub fn parse_param_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidParam(s.to_string())),
    }
}

/// Parses an endpoint name argument
pub fn parse_endpoint_arg(s: &str) -> Result<Endpoint, CliError> {
    s.parse::<Endpoint>().map_err(|e| CliError::UnknownEndpoint(e.0))
}
