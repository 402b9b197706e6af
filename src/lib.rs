//! Deadball library
//!
//! The versioned TTL cache, the cached-fetch layer over the statistics API,
//! and the diagnostic panel. The binary in `main.rs` wires these to the CLI.

pub mod cache;
pub mod cli;
pub mod fetch;
pub mod logging;
pub mod panel;
