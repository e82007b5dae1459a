//! OSCA · VARK - a terminal client for the senior-citizen registry and the
//! VARK learning portal.
//!
//! Senior affairs officers manage the registry and beneficiaries, seniors
//! see their own record, teachers publish learning modules and run classes,
//! and students follow modules matched to their learning style.

mod app;
mod cli;
mod forms;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oscavark_core::config::Config;

use app::{App, AppState};
use cli::Command;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "oscavark.log";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Command-line runs log to stderr.
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// The TUI owns the terminal, so logs go to a daily file instead. The guard
/// must live until exit or buffered lines are lost.
fn init_file_tracing() -> Option<WorkerGuard> {
    let dir = Config::load()
        .unwrap_or_default()
        .cache_dir()
        .ok()?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1).and_then(|a| Command::parse(a)) {
        init_stderr_tracing();
        return cli::run(command).await;
    }
    let start_path = args.get(1).filter(|a| a.starts_with('/')).cloned();

    // Initialize logging
    let _log_guard = init_file_tracing();
    info!("OSCA/VARK TUI starting");

    // Create app before touching the terminal so config errors print normally
    let mut app = App::new()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    if app.restore_session().await {
        if let Some(ref path) = start_path {
            app.open_route(path);
        }
        // Start background refresh if cache is stale
        if app.is_cache_stale() {
            app.refresh_all_background();
        }
    } else {
        match start_path {
            Some(ref path) => app.open_route(path),
            None => app.start_login(),
        }
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("OSCA/VARK TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Renew the token before anything below talks to the server
        app.keep_session_fresh().await;

        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
