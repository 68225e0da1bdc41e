//! Flip TUI
//!
//! Terminal dashboard for feature flags.
//!
//! ## Layout
//!
//! Three-pane layout:
//! - Left: Flags (configured toggle bindings with sync markers)
//! - Middle: Inventory (laptop fleet, searchable)
//! - Right: Compliance (region-based report, flag-gated)
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - h/l or ←/→: Switch focus between panes
//! - Tab: Cycle through panes
//! - Space/Enter: Toggle selected flag
//! - r: Cycle region
//! - /: Search inventory
//! - q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flip_core::{
    spawn_engine, spawn_stream_provider, BindingRegistry, Config, Context, EngineCommand,
    EngineHandle, FlagProvider, FlagValue, HttpRelay, Notice, StaticProvider, StreamConfig,
};

use app::{ActivePane, App, InputMode};

/// Run the TUI dashboard
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if FLIP_LOG is set)
    init_tui_logging(&config);

    let registry = BindingRegistry::from_bindings(config.bindings.clone());

    let provider: Arc<dyn FlagProvider> = match config.provider.credentials() {
        Some(credentials) => {
            let user_key = config
                .load_or_create_user_key()
                .context("Failed to load user key")?;
            info!(region = %config.provider.region, "starting live flag stream");
            Arc::new(spawn_stream_provider(
                StreamConfig {
                    url: credentials.stream_url,
                    client_key: credentials.client_key,
                    ..StreamConfig::default()
                },
                Context::new(user_key, config.provider.region.clone()),
            ))
        }
        None => {
            info!("no stream credentials, serving binding defaults");
            Arc::new(StaticProvider::degraded(&registry))
        }
    };

    let relay = Arc::new(HttpRelay::new()?);
    let mut handle = spawn_engine(registry, provider, relay);

    let mut app = App::new(&config);
    // The engine only reports status changes, so seed the indicator
    app.provider_status = *handle.status_rx.borrow();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Run app
    let result = run_app(&mut terminal, &mut app, &mut handle).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    handle: &mut EngineHandle,
) -> Result<()> {
    let mut events_open = true;

    loop {
        // Check for notice timeout
        app.check_notice_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Handle engine events and terminal input
        tokio::select! {
            biased;

            event = handle.event_rx.recv(), if events_open => {
                match event {
                    Some(event) => {
                        app.apply_event(event);
                        refresh_bindings(app, &handle.command_tx).await;
                    }
                    None => {
                        events_open = false;
                        app.set_notice(Notice::error("Sync engine stopped"));
                    }
                }
            }

            // Poll for terminal events
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                // Check for terminal events (non-blocking)
                if event::poll(std::time::Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        // If help is showing, any key dismisses it
                        if app.show_help {
                            app.show_help = false;
                            continue;
                        }

                        match app.input_mode {
                            InputMode::Normal => {
                                handle_normal_key(app, &handle.command_tx, key.code, key.modifiers)
                                    .await;
                            }
                            InputMode::Filter => {
                                handle_filter_key(app, key.code);
                            }
                        }
                    }
                }
            }
        }

        if app.should_quit {
            let _ = handle.command_tx.send(EngineCommand::Shutdown).await;
            break;
        }
    }

    Ok(())
}

/// Pull the authoritative binding snapshot from the engine
async fn refresh_bindings(app: &mut App, command_tx: &mpsc::Sender<EngineCommand>) {
    let (reply_tx, reply_rx) = oneshot::channel();
    if command_tx
        .send(EngineCommand::Snapshot(reply_tx))
        .await
        .is_ok()
    {
        if let Ok(snapshot) = reply_rx.await {
            app.set_bindings(snapshot);
        }
    }
}

/// Handle key events in normal mode
async fn handle_normal_key(
    app: &mut App,
    command_tx: &mpsc::Sender<EngineCommand>,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    // Clear transient notices on navigation keys
    match code {
        KeyCode::Char('j')
        | KeyCode::Char('k')
        | KeyCode::Up
        | KeyCode::Down
        | KeyCode::Char('h')
        | KeyCode::Char('l')
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Tab
        | KeyCode::BackTab
        | KeyCode::Char('g')
        | KeyCode::Char('G') => {
            app.notice = None;
        }
        _ => {}
    }

    match code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Navigation: up
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
        }

        // Navigation: down
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
        }

        // Navigation: left pane
        KeyCode::Char('h') | KeyCode::Left => {
            app.prev_pane();
        }

        // Navigation: right pane
        KeyCode::Char('l') | KeyCode::Right => {
            app.next_pane();
        }

        // Tab: cycle panes
        KeyCode::Tab => {
            app.next_pane();
        }

        // Shift+Tab: reverse cycle panes
        KeyCode::BackTab => {
            app.prev_pane();
        }

        // Toggle the selected flag
        KeyCode::Char(' ') | KeyCode::Enter => {
            if app.active_pane == ActivePane::Toggles {
                toggle_selected(app, command_tx).await;
            }
        }

        // Cycle region and re-identify with the provider
        KeyCode::Char('r') => {
            if let Some(region) = app.cycle_region() {
                let _ = command_tx
                    .send(EngineCommand::SetContext(Context::for_region(region)))
                    .await;
            }
        }

        // Inventory search
        KeyCode::Char('/') => {
            app.enter_filter_mode();
        }

        // Help
        KeyCode::Char('?') => {
            app.show_help = true;
        }

        // Vim navigation: G (go to last)
        KeyCode::Char('G') => {
            app.pending_g = None;
            app.move_to_last();
        }

        // Vim navigation: g (start or complete the gg sequence)
        KeyCode::Char('g') => {
            app.press_g();
        }

        _ => {
            // Any other key clears pending 'g'
            app.pending_g = None;
        }
    }
}

/// Send a toggle for the selected binding, or reject non-boolean flags
async fn toggle_selected(app: &mut App, command_tx: &mpsc::Sender<EngineCommand>) {
    let Some(snapshot) = app.selected_binding() else {
        return;
    };
    let flag = snapshot.flag.clone();

    match snapshot.value.as_bool() {
        Some(current) => {
            let _ = command_tx
                .send(EngineCommand::Toggle {
                    flag,
                    desired: FlagValue::Bool(!current),
                })
                .await;
        }
        None => {
            app.set_notice(Notice::error(format!(
                "Flag \"{}\" is not a boolean toggle",
                flag
            )));
        }
    }
}

/// Handle key events in search mode
fn handle_filter_key(app: &mut App, code: KeyCode) {
    match code {
        // Leave search mode, keeping the matches
        KeyCode::Esc | KeyCode::Enter => {
            app.exit_filter_mode();
        }

        // Text input
        KeyCode::Char(c) => {
            app.push_filter_char(c);
        }
        KeyCode::Backspace => {
            app.pop_filter_char();
        }

        _ => {}
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if the FLIP_LOG environment variable is set.
/// Logs to {data_dir}/flip.log so output never corrupts the terminal.
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("FLIP_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("flip_core={},flip={}", log_level, log_level));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
