//! Application state and update logic for the cafe TUI.
//!
//! `App` owns the engine widgets and translates terminal input into their
//! operations. Commands the widgets return are queued in an outbox that
//! the event loop drains into a `Dispatcher`; completions come back
//! through [`App::apply_completion`].

use crate::event::{key_to_action, Action};
use crate::ui::layout::{home_layout, modal_area};
use crate::ui::widgets::TextInputState;
use cafe_engine::{
    Chart, Command, Completion, Config, Conversation, HeroScene, ImageModal, ModalImage,
    PreviewRegistry, ScrollLock, SelectedFile, UploadWidget, ValidationError,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::path::PathBuf;

/// Scroll step, in transcript lines.
const SCROLL_STEP: u16 = 3;

/// Scene pixels per transcript line, used to fade the hero hint.
const LINE_HEIGHT_PX: f64 = 20.0;

/// Notifications stay up for about three seconds at the 4 Hz tick rate.
const NOTIFICATION_TICKS: usize = 12;

/// Which pane receives typed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Chat,
    Upload,
}

/// Application state.
#[derive(Debug)]
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    /// Pane receiving typed input.
    pub focus: Focus,

    pub conversation: Conversation,
    pub upload: UploadWidget,
    pub modal: ImageModal,
    pub scroll_lock: ScrollLock,
    pub previews: PreviewRegistry,
    pub hero: HeroScene,

    /// Chat input line.
    pub input_state: TextInputState,

    /// Image path input line in the upload pane.
    pub path_input: TextInputState,

    /// Whether the chat pane is expanded over the upload pane.
    pub chat_expanded: bool,

    /// Lines scrolled back from the newest message.
    pub transcript_scroll: u16,

    /// Terminal area, used to hit-test mouse clicks.
    pub viewport: Rect,

    /// Tick counter for animations.
    pub tick: usize,

    /// Notification message (displayed temporarily, cleared after some ticks).
    pub notification: Option<String>,

    notification_ttl: usize,

    outbox: Vec<Command>,
}

impl App {
    /// Create a new app instance.
    pub fn new(config: &Config) -> Self {
        let scroll_lock = ScrollLock::new();
        let previews = PreviewRegistry::new();
        Self {
            should_quit: false,
            show_help: false,
            focus: Focus::Chat,
            conversation: Conversation::new(config.conversation_settings()),
            upload: UploadWidget::new(config.upload_settings(), previews.clone()),
            modal: ImageModal::new(scroll_lock.clone()),
            scroll_lock,
            previews,
            hero: HeroScene::new(),
            input_state: TextInputState::new(),
            path_input: TextInputState::new(),
            chat_expanded: false,
            transcript_scroll: 0,
            viewport: Rect::new(0, 0, 80, 24),
            tick: 0,
            notification: None,
            notification_ttl: 0,
            outbox: Vec::new(),
        }
    }

    /// Create an app for tests: offline config, nothing loaded yet.
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::new(&Config::offline())
    }

    /// Commands queued since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply the outcome of a dispatched command.
    pub fn apply_completion(&mut self, completion: Completion) {
        let chat = matches!(completion, Completion::Chat { .. });
        if let Some(follow_up) = completion.apply(&mut self.conversation, &mut self.upload) {
            self.outbox.push(follow_up);
        }
        if chat {
            self.transcript_scroll = 0;
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.modal.is_open() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                    self.modal.close();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                _ => {}
            }
            return;
        }

        if !self.handle_text_key(key) {
            self.handle_action(key_to_action(key));
        }
    }

    /// Route editing keys to the focused input. Returns whether the key was consumed.
    fn handle_text_key(&mut self, key: KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }
        let focus = self.focus;
        let input = match focus {
            Focus::Chat => &mut self.input_state,
            Focus::Upload => &mut self.path_input,
        };
        match key.code {
            KeyCode::Char(c) => input.insert(c),
            KeyCode::Backspace => input.backspace(),
            KeyCode::Delete => input.delete(),
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Home => input.move_home(),
            KeyCode::End => input.move_end(),
            KeyCode::Up if focus == Focus::Chat => input.history_prev(),
            KeyCode::Down if focus == Focus::Chat => input.history_next(),
            _ => return false,
        }
        true
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
            }
            Action::Help => self.show_help = !self.show_help,
            Action::Back => {
                if self.modal.is_open() {
                    self.modal.close();
                } else {
                    self.show_help = false;
                }
            }
            Action::FocusNext => {
                self.focus = match self.focus {
                    Focus::Chat if !self.chat_expanded => Focus::Upload,
                    _ => Focus::Chat,
                };
            }
            Action::ToggleExpand => {
                self.chat_expanded = !self.chat_expanded;
                if self.chat_expanded {
                    self.focus = Focus::Chat;
                }
            }
            Action::OpenChart => self.open_chart(),
            Action::ClearFile => {
                if self.upload.clear() {
                    self.set_notification("Image cleared".to_string());
                }
            }
            Action::Submit => match self.focus {
                Focus::Chat => self.submit_question(),
                Focus::Upload => self.submit_upload(),
            },
            Action::ScrollUp => self.scroll_by(i32::from(SCROLL_STEP)),
            Action::ScrollDown => self.scroll_by(-i32::from(SCROLL_STEP)),
            Action::None => {}
        }
    }

    fn submit_question(&mut self) {
        match self.conversation.submit(self.input_state.content()) {
            Ok(command) => {
                self.input_state.submit();
                self.transcript_scroll = 0;
                self.outbox.push(command.into());
            }
            // Blank input is silently ignored.
            Err(ValidationError::EmptyInput) => {}
            Err(e) => self.set_notification(e.to_string()),
        }
    }

    fn submit_upload(&mut self) {
        if !self.path_input.content().trim().is_empty() {
            let raw = self.path_input.take();
            self.select_path(&raw);
            return;
        }
        match self.upload.submit() {
            Ok(command) => self.outbox.push(command.into()),
            Err(ValidationError::Busy) => {
                self.set_notification(ValidationError::Busy.to_string());
            }
            // Shown inline by the upload pane.
            Err(_) => {}
        }
    }

    /// Read the file at a typed path and select it.
    pub fn select_path(&mut self, raw: &str) {
        let Some(path) = normalize_path(raw) else {
            return;
        };
        match SelectedFile::from_path(&path) {
            Ok(file) => {
                let _ = self.upload.select_file(file);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read file");
                self.set_notification(format!("Could not read {}: {e}", path.display()));
            }
        }
    }

    /// Handle pasted text.
    ///
    /// In the upload pane a paste is a file drop: each line is a path and the
    /// first readable one is selected. Elsewhere it is typed into the input.
    pub fn handle_paste(&mut self, text: &str) {
        if self.modal.is_open() {
            return;
        }
        if self.focus == Focus::Chat {
            self.input_state.insert_str(text);
            return;
        }

        self.upload.drag_enter();
        let mut files = Vec::new();
        for path in text.lines().filter_map(normalize_path) {
            match SelectedFile::from_path(&path) {
                Ok(file) => files.push(file),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "dropped path unreadable");
                }
            }
        }
        if files.is_empty() && !text.trim().is_empty() {
            self.set_notification("Nothing readable was dropped".to_string());
        }
        let _ = self.upload.drop_files(files);
    }

    /// Handle a mouse event.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let at = Position::new(mouse.column, mouse.row);

        if self.modal.is_open() {
            if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                if modal_area(self.viewport).contains(at) {
                    self.modal.click_inside();
                } else {
                    self.modal.click_outside();
                }
            }
            return;
        }

        let layout = home_layout(self.viewport, self.chat_expanded);
        let over_upload = layout.upload.is_some_and(|area| area.contains(at));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if over_upload {
                    self.focus = Focus::Upload;
                } else if layout.chat.contains(at) {
                    self.focus = Focus::Chat;
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if over_upload {
                    self.upload.drag_over();
                } else {
                    self.upload.drag_leave();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.upload.drag_leave(),
            MouseEventKind::ScrollUp => self.handle_action(Action::ScrollUp),
            MouseEventKind::ScrollDown => self.handle_action(Action::ScrollDown),
            _ => {}
        }
    }

    fn open_chart(&mut self) {
        let Some(result) = self.upload.result() else {
            self.set_notification("No analysis to show yet".to_string());
            return;
        };
        match result.chart() {
            Chart::Available(data) => {
                let image = ModalImage {
                    title: format!("{} roast analysis", result.roast_level),
                    data: data.to_string(),
                };
                self.modal.open(image);
            }
            Chart::Insufficient => {
                self.set_notification("Chart has insufficient data".to_string());
            }
            Chart::Missing => self.set_notification("No chart in this analysis".to_string()),
        }
    }

    /// Scroll the transcript; positive is back in time. Ignored while scroll is locked.
    fn scroll_by(&mut self, delta: i32) {
        if self.scroll_lock.is_locked() {
            return;
        }
        let next = i32::from(self.transcript_scroll).saturating_add(delta).max(0);
        self.transcript_scroll = u16::try_from(next).unwrap_or(u16::MAX);
        self.hero
            .set_scroll(f64::from(self.transcript_scroll) * LINE_HEIGHT_PX);
    }

    /// Set a temporary notification message.
    pub fn set_notification(&mut self, msg: String) {
        self.notification = Some(msg);
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    /// Increment tick counter and update time-based state.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        // The scene is ready once the loop is running.
        self.hero.mark_loaded();

        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }
}

/// Clean up a typed or dropped path: surrounding quotes and `file://` go.
fn normalize_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);
    let path = unquoted.strip_prefix("file://").unwrap_or(unquoted).trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}
