//! Integration tests for CLI argument handling
//!
//! Runs the binary against a temporary cache directory and an unreachable API.

use std::process::Command;
use std::sync::Arc;

use deadball::cache::{CacheConfig, CacheStore, FileStorage};
use deadball::fetch::Endpoint;
use tempfile::TempDir;

/// Nothing listens here, so any live fetch fails fast
const DEAD_API: &str = "http://127.0.0.1:9";

/// Helper to run the CLI with given args and capture output
fn run_cli(cache_dir: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_deadball"))
        .arg("--cache-dir")
        .arg(cache_dir.path())
        .arg("--api-url")
        .arg(DEAD_API)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute deadball")
}

fn store_for(cache_dir: &TempDir) -> CacheStore {
    CacheStore::new(Arc::new(FileStorage::new(cache_dir.path())))
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_deadball"))
        .arg("--help")
        .output()
        .expect("Failed to execute deadball");
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deadball"), "Help should mention deadball");
    for command in ["fetch", "info", "remove", "clear", "panel"] {
        assert!(stdout.contains(command), "Help should mention {}", command);
    }
}

#[test]
fn test_unknown_endpoint_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["fetch", "home_runs"]);
    assert!(!output.status.success(), "Expected unknown endpoint to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown endpoint"),
        "Should print error message about the endpoint: {}",
        stderr
    );
}

#[test]
fn test_malformed_param_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["fetch", "drag_vs_hr", "-p", "granularity"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid parameter"), "{}", stderr);
}

#[test]
fn test_fetch_served_from_cache_without_network() {
    let dir = TempDir::new().unwrap();
    let endpoint = Endpoint::DragVsHr;
    let key = endpoint.cache_key(&endpoint.default_params());
    let payload = serde_json::json!([{ "month": "2019-06", "home_runs": 1135 }]);
    assert!(store_for(&dir).set(&key, &payload, Some(&CacheConfig::charts())));

    let output = run_cli(&dir, &["fetch", "drag_vs_hr"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed, payload);
}

#[test]
fn test_fetch_with_empty_cache_reports_failure() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["fetch", "drag_coefficient_stats"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "{}", stderr);
    assert!(store_for(&dir).keys().is_empty(), "Failure must not be cached");
}

#[test]
fn test_fetch_with_other_version_ignores_entry() {
    let dir = TempDir::new().unwrap();
    let key = Endpoint::DragCoefficientStats
        .cache_key(&Endpoint::DragCoefficientStats.default_params());
    store_for(&dir).set(&key, &serde_json::json!({"mean": 0.35}), Some(&CacheConfig::charts()));

    let output = run_cli(
        &dir,
        &["fetch", "drag_coefficient_stats", "--cache-version", "9.9"],
    );

    assert!(!output.status.success(), "Mismatched version should go live");
    assert!(!store_for(&dir).cache_info(&key).exists, "Stale entry is purged");
}

#[test]
fn test_info_lists_stored_keys() {
    let dir = TempDir::new().unwrap();
    store_for(&dir).set("/drag_vs_hr_granularity=year", &vec![1, 2], None);

    let output = run_cli(&dir, &["info"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/drag_vs_hr_granularity=year"));
    assert!(stdout.contains("Cached items: 1/1"));
}

#[test]
fn test_info_reports_missing_keys() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["info", "/nothing_here"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Not cached"));
    assert!(stdout.contains("Cached items: 0/1"));
}

#[test]
fn test_remove_and_clear() {
    let dir = TempDir::new().unwrap();
    let store = store_for(&dir);
    store.set("a", &1, None);
    store.set("b", &2, None);

    let output = run_cli(&dir, &["remove", "a"]);
    assert!(output.status.success());
    assert!(!store.cache_info("a").exists);
    assert!(store.cache_info("b").exists);

    let output = run_cli(&dir, &["clear"]);
    assert!(output.status.success());
    assert!(store.keys().is_empty());
}

#[test]
fn test_remove_missing_key_succeeds() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["remove", "never-stored"]);
    assert!(output.status.success());
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use deadball::cli::{parse_endpoint_arg, parse_param_arg, Cli, Command, FetchRequest};
    use deadball::fetch::Endpoint;

    #[test]
    fn test_cli_info_without_keys() {
        let cli = Cli::parse_from(["deadball", "info"]);
        match cli.command {
            Command::Info { keys } => assert!(keys.is_empty()),
            other => panic!("expected info, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_panel_with_keys() {
        let cli = Cli::parse_from(["deadball", "panel", "/a", "/b"]);
        match cli.command {
            Command::Panel { keys } => assert_eq!(keys, vec!["/a", "/b"]),
            other => panic!("expected panel, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["deadball"]).is_err());
    }

    #[test]
    fn test_cli_log_flags() {
        let cli = Cli::parse_from(["deadball", "--log-json", "--log-level", "debug", "clear"]);
        assert!(cli.log_json);
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_parse_endpoint_arg_all_names() {
        for endpoint in Endpoint::ALL {
            assert_eq!(parse_endpoint_arg(endpoint.name()).unwrap(), endpoint);
        }
    }

    #[test]
    fn test_parse_param_arg_trims_name() {
        let (name, value) = parse_param_arg(" granularity =year").unwrap();
        assert_eq!(name, "granularity");
        assert_eq!(value, "year");
    }

    #[test]
    fn test_fetch_request_key_matches_endpoint_key() {
        let cli = Cli::parse_from(["deadball", "fetch", "drag_vs_hr"]);
        let request = FetchRequest::from_command(&cli.command).unwrap().unwrap();
        assert_eq!(
            request.endpoint.cache_key(&request.params),
            "/drag_vs_hr_granularity=month"
        );
    }
}
