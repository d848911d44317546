//! FoodSave TUI - browse the FoodSave catalog from the terminal.
//!
//! Filters, sorting, search and "load more" go through the catalog's own
//! URLs; the cart, favorites, view mode and last known location are kept in
//! local storage under the data directory.

mod app;
mod ui;

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use foodsave_core::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file prefix; the appender adds the date
const LOG_FILE: &str = "foodsave.log";

const USAGE: &str = "\
Usage: foodsave [CATALOG_URL]
       foodsave --write-config

Browse the FoodSave catalog. CATALOG_URL may carry filters, e.g.
  foodsave 'http://localhost:8000/catalog/?type=dishes&sort=price'

  --write-config  save the effective configuration (file plus
                  environment overrides) and exit

Environment:
  FOODSAVE_URL          default catalog URL
  FOODSAVE_LOCATION     fixed position as lat,lng
  FOODSAVE_GEOLOCATION  ip | fixed | denied | off
  FOODSAVE_DATA_DIR     local storage and log directory
  RUST_LOG              log filter (default: warn)";

/// Initialize the tracing subscriber.
///
/// The terminal is in raw mode while the app runs, so logs go to a daily
/// file under `log_dir`. Use RUST_LOG to control the level.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    if args.iter().skip(1).any(|a| a == "--write-config") {
        config.save().context("Failed to save configuration")?;
        println!("Wrote {}", Config::config_path()?.display());
        return Ok(());
    }
    let start_url = args.get(1).cloned().unwrap_or_else(|| config.catalog_url.clone());

    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let _log_guard = init_tracing(&data_dir);
    info!(url = %start_url, "FoodSave TUI starting");

    let mut app = App::new(&config, &start_url)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("FoodSave TUI shutting down");
    Ok(())
}

/// The key behind a press event; everything else is ignored.
fn pressed_key(event: Event) -> Option<KeyEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(key),
        _ => None,
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            // Releases and repeats still fall through to the background checks
            if let Some(key) = pressed_key(event::read()?) {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        // Fire debounced filters and expire toasts
        app.tick(Instant::now());

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }

        // Let spawned fetches make progress between frames
        tokio::task::yield_now().await;
    }
}
