//! Test utilities for cafe-tui rendering tests.
//!
//! Helpers for building test terminals, rendering screens and turning
//! buffers into strings for assertions and snapshots.

use crate::app::App;
use crate::screens::Screen;
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Create a test terminal with the default dimensions (80x24).
pub fn create_test_terminal() -> Terminal<TestBackend> {
    create_test_terminal_sized(TEST_WIDTH, TEST_HEIGHT)
}

/// Create a test terminal with custom dimensions.
pub fn create_test_terminal_sized(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("Failed to create test terminal")
}

/// Create an app running in offline mode with no network behind it.
pub fn create_test_app() -> App {
    App::new_for_test()
}

/// Convert a buffer to text, one line per row with trailing spaces trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
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

/// Render a screen at the default size and return it as a string.
pub fn render_screen_to_string<S: Screen>(screen: &S, app: &App) -> String {
    render_screen_to_string_sized(screen, app, TEST_WIDTH, TEST_HEIGHT)
}

/// Render a screen at a custom size and return it as a string.
pub fn render_screen_to_string_sized<S: Screen>(
    screen: &S,
    app: &App,
    width: u16,
    height: u16,
) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    screen.render(app, area, &mut buffer);
    buffer_to_string(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Focus;
    use crate::screens::home::HomeScreen;

    #[test]
    fn test_create_test_terminal() {
        let terminal = create_test_terminal();
        let size = terminal.size().unwrap();
        assert_eq!(size.width, TEST_WIDTH);
        assert_eq!(size.height, TEST_HEIGHT);
    }

    #[test]
    fn test_create_test_app() {
        let app = create_test_app();
        assert_eq!(app.focus, Focus::Chat);
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[test]
    fn test_buffer_to_string_trims_rows() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buffer = Buffer::empty(area);
        buffer.set_string(0, 0, "Hello", ratatui::style::Style::default());
        buffer.set_string(0, 2, "World", ratatui::style::Style::default());

        assert_eq!(buffer_to_string(&buffer), "Hello\n\nWorld");
    }

    #[test]
    fn test_render_sized() {
        let app = create_test_app();
        let screen = render_screen_to_string_sized(&HomeScreen, &app, 100, 30);
        assert_eq!(screen.lines().count(), 30);
    }
}
