//! Event handling for the cafe TUI.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events that can occur in the TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// A mouse event occurred.
    Mouse(MouseEvent),
    /// Bracketed paste. Dropping a file on most terminals pastes its path.
    Paste(String),
    /// A tick event for UI updates.
    Tick,
    /// Terminal was resized.
    Resize(u16, u16),
}

/// Reads terminal events on a blocking thread and forwards them.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_clone = tx.clone();

        // crossterm polling blocks, so it gets its own thread.
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => Some(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Paste(text)) => Some(Event::Paste(text)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        _ => None,
                    }
                } else {
                    Some(Event::Tick)
                };
                if let Some(e) = event {
                    if tx_clone.send(e).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Get the next event, waiting until one is available.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Key action that can be performed in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    /// Close the topmost overlay.
    Back,
    /// Move focus between the chat and upload panes.
    FocusNext,
    /// Switch the chat pane between normal and expanded size.
    ToggleExpand,
    /// Show the analysis chart in the image modal.
    OpenChart,
    /// Discard the selected file.
    ClearFile,
    /// Send the question or load/submit the image, depending on focus.
    Submit,
    ScrollUp,
    ScrollDown,
    None,
}

/// Convert a key event to an action.
///
/// Plain characters are never actions; they belong to the focused input.
pub fn key_to_action(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c' | 'q') => Action::Quit,
            KeyCode::Char('e') => Action::ToggleExpand,
            KeyCode::Char('o') => Action::OpenChart,
            KeyCode::Char('x') => Action::ClearFile,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::F(1) => Action::Help,
        KeyCode::Esc => Action::Back,
        KeyCode::Enter => Action::Submit,
        KeyCode::Tab | KeyCode::BackTab => Action::FocusNext,
        KeyCode::PageUp => Action::ScrollUp,
        KeyCode::PageDown => Action::ScrollDown,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_shortcuts() {
        assert_eq!(key_to_action(ctrl('c')), Action::Quit);
        assert_eq!(key_to_action(ctrl('q')), Action::Quit);
        assert_eq!(key_to_action(ctrl('e')), Action::ToggleExpand);
        assert_eq!(key_to_action(ctrl('o')), Action::OpenChart);
        assert_eq!(key_to_action(ctrl('x')), Action::ClearFile);
        assert_eq!(key_to_action(ctrl('z')), Action::None);
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(key_to_action(key(KeyCode::Enter)), Action::Submit);
        assert_eq!(key_to_action(key(KeyCode::Esc)), Action::Back);
        assert_eq!(key_to_action(key(KeyCode::F(1))), Action::Help);
        assert_eq!(key_to_action(key(KeyCode::BackTab)), Action::FocusNext);
        assert_eq!(key_to_action(key(KeyCode::PageUp)), Action::ScrollUp);
    }

    #[test]
    fn test_characters_are_not_actions() {
        assert_eq!(key_to_action(key(KeyCode::Char('q'))), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('?'))), Action::None);
    }
}
