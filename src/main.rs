//! Deadball - cached access to juiced vs. dead ball statistics
//!
//! Fetches chart data from the statistics API through a versioned,
//! time-limited local cache, and offers commands and a terminal panel to
//! inspect and evict cached entries.

use std::io::{self, Write};
use std::panic;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde_json::Value;
use tracing::{debug, info};

use deadball::cache::{CacheConfig, CacheStore, FileStorage};
use deadball::cli::{Cli, Command, FetchRequest, Settings};
use deadball::fetch::{common_cache_keys, ApiClient, CachedApi, CachedApiOptions};
use deadball::logging::init_logging;
use deadball::panel::{format_size, render_panel, CacheReport, PanelApp};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the panel panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    // The panel owns the terminal; log lines would corrupt the screen
    if !matches!(cli.command, Command::Panel { .. }) {
        init_logging(&settings.logging);
    }

    let store = CacheStore::new(Arc::new(FileStorage::new(&settings.cache_dir)));
    debug!(cache_dir = %settings.cache_dir.display(), "cache store ready");

    match &cli.command {
        Command::Fetch { .. } => {
            let request = match FetchRequest::from_command(&cli.command) {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(ExitCode::SUCCESS),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(ExitCode::from(2));
                }
            };
            run_fetch(store, &settings, request).await
        }
        Command::Info { keys } => {
            let keys = if keys.is_empty() {
                store.keys()
            } else {
                keys.clone()
            };
            let report = CacheReport::collect(&store, keys);
            let mut stdout = io::stdout().lock();
            report.write_table(&mut stdout)?;

            let recent = store.summary(CacheConfig::default().duration);
            writeln!(
                stdout,
                "Written in the last 24h: {} entries, {}",
                recent.count,
                format_size(Some(recent.total_size))
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { key } => {
            if store.remove(key) {
                println!("Cleared {}", key);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Failed to clear {}", key);
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Clear => {
            if store.clear() {
                println!("Cleared all cached data");
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Failed to clear cache");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Panel { keys } => {
            let keys = if keys.is_empty() {
                common_cache_keys()
            } else {
                keys.clone()
            };
            run_panel(PanelApp::new(store, keys))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads one endpoint through the cache and prints its payload as pretty JSON
async fn run_fetch(
    store: CacheStore,
    settings: &Settings,
    request: FetchRequest,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = ApiClient::new(settings.api_url.clone());
    let options = CachedApiOptions {
        cache_config: Some(request.config),
        skip_cache: request.skip_cache,
        ..Default::default()
    };
    let api: CachedApi<Value> = CachedApi::with_options(
        store,
        client,
        request.endpoint.path(),
        request.params,
        options,
    );
    info!(key = %api.cache_key(), "loading");

    let state = if request.refresh {
        api.refetch().await
    } else {
        api.load().await
    };

    if let Some(error) = state.error {
        eprintln!("Error: {}", error);
        return Ok(ExitCode::FAILURE);
    }

    let mut stdout = io::stdout().lock();
    if let Some(data) = state.data {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&data)?)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs the interactive cache panel until the user quits
fn run_panel(mut app: PanelApp) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| render_panel(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
