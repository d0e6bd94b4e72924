//! Headless mode for the cafe TUI.
//!
//! Runs the TUI against a `TestBackend` instead of a real terminal, so it
//! can be driven from tests and automation. Inputs go in over a channel and
//! the rendered screen comes back after each frame.

use crate::app::App;
use crate::event::{Action, Event};
use crate::{draw, handle_event};
use cafe_engine::{CoffeeApi, Config, Dispatcher, UploadPhase};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default terminal dimensions for headless mode.
pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

/// Something to feed the headless TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A raw terminal event.
    Event(Event),
    /// An action, bypassing key mapping.
    Action(Action),
}

/// State captured from the headless TUI after each render.
#[derive(Debug, Clone)]
pub struct HeadlessState {
    /// Text contents of the terminal buffer.
    pub screen_contents: String,
    pub should_quit: bool,
    pub show_help: bool,
    pub modal_open: bool,
    pub scroll_locked: bool,
    /// Whether a chat request is in flight.
    pub sending: bool,
    pub upload_phase: UploadPhase,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            screen_contents: String::new(),
            should_quit: false,
            show_help: false,
            modal_open: false,
            scroll_locked: false,
            sending: false,
            upload_phase: UploadPhase::Empty,
        }
    }
}

impl HeadlessState {
    fn capture(app: &App, buffer: &Buffer) -> Self {
        Self {
            screen_contents: buffer_to_string(buffer),
            should_quit: app.should_quit,
            show_help: app.show_help,
            modal_open: app.modal.is_open(),
            scroll_locked: app.scroll_lock.is_locked(),
            sending: app.conversation.is_sending(),
            upload_phase: app.upload.phase(),
        }
    }
}

/// Handle to control a headless TUI instance.
pub struct HeadlessHandle {
    input_tx: mpsc::UnboundedSender<Input>,
    state_rx: watch::Receiver<HeadlessState>,
}

impl HeadlessHandle {
    /// Send an action to the TUI. Returns `true` if it was delivered.
    pub fn send_action(&self, action: Action) -> bool {
        self.input_tx.send(Input::Action(action)).is_ok()
    }

    /// Send a raw event to the TUI.
    pub fn send_event(&self, event: Event) -> bool {
        self.input_tx.send(Input::Event(event)).is_ok()
    }

    /// Send a key press with no modifiers.
    pub fn send_key(&self, code: KeyCode) -> bool {
        self.send_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    /// Type text into the focused input, one key per character.
    pub fn type_text(&self, text: &str) -> bool {
        text.chars().all(|c| self.send_key(KeyCode::Char(c)))
    }

    /// Paste text, as a terminal does for a dropped file.
    pub fn paste(&self, text: &str) -> bool {
        self.send_event(Event::Paste(text.to_string()))
    }

    /// Get the current state of the TUI.
    pub fn state(&self) -> HeadlessState {
        self.state_rx.borrow().clone()
    }

    /// Wait until a condition holds, or `None` on timeout.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<HeadlessState>
    where
        F: Fn(&HeadlessState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self.state();
            if condition(&state) {
                return Some(state);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, self.state_rx.changed()).await {
                Ok(Ok(())) => {}
                // Timed out, or the loop exited.
                Ok(Err(_)) | Err(_) => return None,
            }
        }
    }

    /// Wait for specific text to appear on screen.
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<HeadlessState> {
        self.wait_for(|s| s.screen_contents.contains(text), timeout)
            .await
    }

    /// Check if the TUI has quit.
    pub fn has_quit(&self) -> bool {
        self.state().should_quit
    }
}

/// Configuration for headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub width: u16,
    pub height: u16,
    pub tick_rate_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_rate_ms: 50,
        }
    }
}

/// Run the TUI in headless mode against the given backend.
///
/// Returns a handle to drive the TUI and the join handle of its loop.
///
/// # Example
///
/// ```ignore
/// let (mut handle, task) = run_tui_headless(api, &Config::offline(), HeadlessConfig::default());
/// handle.type_text("What is a cortado?");
/// handle.send_key(KeyCode::Enter);
/// handle.wait_for_text("You: What is a cortado?", Duration::from_secs(1)).await;
/// handle.send_action(Action::Quit);
/// task.await.unwrap();
/// ```
pub fn run_tui_headless<A: CoffeeApi>(
    api: A,
    config: &Config,
    headless: HeadlessConfig,
) -> (HeadlessHandle, JoinHandle<Result<(), String>>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(HeadlessState::default());

    let mut app = App::new(config);
    app.viewport = Rect::new(0, 0, headless.width, headless.height);

    let task = tokio::spawn(async move {
        run_headless_loop(api, app, headless, input_rx, state_tx)
            .await
            .map_err(|e| e.to_string())
    });

    (HeadlessHandle { input_tx, state_rx }, task)
}

async fn run_headless_loop<A: CoffeeApi>(
    api: A,
    mut app: App,
    headless: HeadlessConfig,
    mut input_rx: mpsc::UnboundedReceiver<Input>,
    state_tx: watch::Sender<HeadlessState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let backend = TestBackend::new(headless.width, headless.height);
    let mut terminal = Terminal::new(backend)?;
    let (dispatcher, mut completions) = Dispatcher::new(api);
    let tick = Duration::from_millis(headless.tick_rate_ms);

    loop {
        for command in app.take_commands() {
            dispatcher.dispatch(command);
        }

        terminal.draw(|frame| draw(&app, frame))?;
        let _ = state_tx.send(HeadlessState::capture(&app, terminal.backend().buffer()));

        if app.should_quit {
            break;
        }

        tokio::select! {
            input = input_rx.recv() => match input {
                Some(Input::Event(event)) => handle_event(&mut app, event),
                Some(Input::Action(action)) => app.handle_action(action),
                // Every handle is gone.
                None => break,
            },
            Some(completion) = completions.recv() => app.apply_completion(completion),
            () = tokio::time::sleep(tick) => app.tick(),
        }
    }

    Ok(())
}

fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_engine::{AnalysisResult, ChatReply, ChatRequest, SelectedFile, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    /// Backend that answers every question and counts analyses.
    #[derive(Clone, Default)]
    struct EchoApi {
        analyses: Arc<AtomicUsize>,
    }

    impl CoffeeApi for EchoApi {
        async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
            Ok(ChatReply::answer(format!("Echo: {}", request.question)))
        }

        async fn analyze(&self, _file: &SelectedFile) -> Result<AnalysisResult, TransportError> {
            self.analyses.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    fn remote_config() -> Config {
        let mut config = Config::default();
        config.success_reset_ms = 50;
        config
    }

    fn write_png(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("beans.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        path
    }

    #[test]
    fn test_headless_state_default() {
        let state = HeadlessState::default();
        assert!(!state.should_quit);
        assert!(!state.modal_open);
        assert_eq!(state.upload_phase, UploadPhase::Empty);
        assert!(state.screen_contents.is_empty());
    }

    #[test]
    fn test_headless_config_default() {
        let config = HeadlessConfig::default();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.tick_rate_ms, 50);
    }

    #[tokio::test]
    async fn test_quit_stops_loop() {
        let (mut handle, task) =
            run_tui_headless(EchoApi::default(), &Config::offline(), HeadlessConfig::default());
        handle.wait_for_text("CaféBot Roastery", WAIT).await.unwrap();

        assert!(handle.send_action(Action::Quit));
        task.await.unwrap().unwrap();
        assert!(handle.has_quit());
    }

    #[tokio::test]
    async fn test_remote_chat_round_trip() {
        let (mut handle, task) =
            run_tui_headless(EchoApi::default(), &remote_config(), HeadlessConfig::default());

        handle.type_text("What is a cortado?");
        handle.send_key(KeyCode::Enter);

        let state = handle
            .wait_for_text("Echo: What is a cortado?", WAIT)
            .await
            .unwrap();
        assert!(state.screen_contents.contains("You: What is a cortado?"));
        assert!(!state.sending);

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_canned_chat_reply() {
        let (mut handle, task) =
            run_tui_headless(EchoApi::default(), &Config::offline(), HeadlessConfig::default());

        handle.type_text("espresso");
        handle.send_key(KeyCode::Enter);

        let state = handle
            .wait_for(|s| !s.sending && s.screen_contents.contains("You: espresso"), WAIT)
            .await
            .unwrap();
        assert!(!state.screen_contents.contains("Echo:"));

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_image_simulated_analysis() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir);
        let api = EchoApi::default();
        let (mut handle, task) =
            run_tui_headless(api.clone(), &Config::offline(), HeadlessConfig::default());

        handle.send_action(Action::FocusNext);
        handle.paste(&path.display().to_string());
        handle
            .wait_for(|s| s.upload_phase == UploadPhase::FileSelected, WAIT)
            .await
            .unwrap();

        handle.send_key(KeyCode::Enter);
        let state = handle
            .wait_for(|s| s.upload_phase == UploadPhase::Succeeded, WAIT)
            .await
            .unwrap();
        assert!(state.screen_contents.contains("[ok] Analysis complete"));
        assert_eq!(api.analyses.load(Ordering::SeqCst), 0);

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_remote_analysis_failure_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir);
        let api = EchoApi::default();
        let (mut handle, task) =
            run_tui_headless(api.clone(), &remote_config(), HeadlessConfig::default());

        handle.send_action(Action::FocusNext);
        handle.paste(&path.display().to_string());
        handle
            .wait_for(|s| s.upload_phase == UploadPhase::FileSelected, WAIT)
            .await
            .unwrap();
        handle.send_key(KeyCode::Enter);

        let state = handle
            .wait_for(
                |s| s.upload_phase == UploadPhase::FileSelected && s.screen_contents.contains("[x]"),
                WAIT,
            )
            .await
            .unwrap();
        assert!(state.screen_contents.contains("File: beans.png"));
        assert_eq!(api.analyses.load(Ordering::SeqCst), 1);

        handle.send_action(Action::Quit);
        task.await.unwrap().unwrap();
    }

    #[test]
    fn test_buffer_to_string() {
        let area = Rect::new(0, 0, 10, 2);
        let mut buffer = Buffer::empty(area);
        buffer.set_string(0, 0, "Hello", ratatui::style::Style::default());
        buffer.set_string(0, 1, "World", ratatui::style::Style::default());

        assert_eq!(buffer_to_string(&buffer), "Hello\nWorld");
    }
}
