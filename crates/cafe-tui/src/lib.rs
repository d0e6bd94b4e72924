//! cafe-tui: Terminal UI for the CaféBot chat and roast-analysis widgets
//!
//! This crate provides the TUI layer for cafe, including:
//! - The home screen with the hero banner, chat pane and upload pane
//! - The chart modal and help overlay
//! - Headless mode for testing and automation

mod app;
mod event;
pub mod headless;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod ui;

use screens::Screen as ScreenTrait;

pub use app::{App, Focus};
pub use cafe_engine;
pub use event::{Action, Event, EventHandler};

use cafe_engine::{Completion, Config, Dispatcher, HttpClient};
use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Frame, Terminal};
use std::io::{self, stdout};
use tokio::sync::mpsc;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen,
            ShowCursor
        );
    }
}

/// Run the TUI application.
///
/// Sets up the terminal, runs the event loop against the configured
/// backend and restores the terminal on exit.
pub async fn run_tui(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::from_config(config)?;
    let (dispatcher, completions) = Dispatcher::new(client);

    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let size = terminal.size()?;
    app.viewport = Rect::new(0, 0, size.width, size.height);

    // 4 Hz tick rate drives the spinner and notification expiry.
    let mut events = EventHandler::new(250);

    tracing::info!(chat_mode = ?config.chat_mode, upload_mode = ?config.upload_mode, "starting tui");
    let result = run_loop(&mut terminal, &mut app, &mut events, &dispatcher, completions).await;

    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    dispatcher: &Dispatcher<HttpClient>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        for command in app.take_commands() {
            dispatcher.dispatch(command);
        }

        terminal.draw(|frame| draw(app, frame))?;

        if app.should_quit {
            break;
        }

        tokio::select! {
            Some(event) = events.next() => handle_event(app, event),
            Some(completion) = completions.recv() => app.apply_completion(completion),
            else => break,
        }
    }

    Ok(())
}

/// Draw the home screen and any overlays on top of it.
pub(crate) fn draw(app: &App, frame: &mut Frame<'_>) {
    let area = frame.area();
    let buf = frame.buffer_mut();

    screens::home::HomeScreen.render(app, area, buf);

    if app.modal.is_open() {
        screens::render_image_modal(app, area, buf);
    }
    if app.show_help {
        screens::render_help_overlay(area, buf);
    }
}

/// Route a terminal event to the app.
pub(crate) fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => app.handle_key(key),
        Event::Mouse(mouse) => app.handle_mouse(mouse),
        Event::Paste(text) => app.handle_paste(&text),
        Event::Tick => app.tick(),
        Event::Resize(width, height) => app.viewport = Rect::new(0, 0, width, height),
    }
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
