//! Layout helpers for the cafe TUI.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Height of the hero banner at the top of the home screen.
pub const HERO_HEIGHT: u16 = 3;

/// Create a centered rect with the given percentage of the parent.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Create a centered rect with fixed dimensions.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Create the main layout with status bar at bottom.
pub fn main_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    (chunks[0], chunks[1])
}

/// Areas of the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeLayout {
    pub hero: Rect,
    pub chat: Rect,
    /// `None` while the chat pane is expanded.
    pub upload: Option<Rect>,
    pub status: Rect,
}

/// Split the screen into hero, chat, upload and status bar.
pub fn home_layout(area: Rect, chat_expanded: bool) -> HomeLayout {
    let (main, status) = main_layout(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HERO_HEIGHT), Constraint::Min(5)])
        .split(main);

    if chat_expanded {
        return HomeLayout {
            hero: rows[0],
            chat: rows[1],
            upload: None,
            status,
        };
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    HomeLayout {
        hero: rows[0],
        chat: columns[0],
        upload: Some(columns[1]),
        status,
    }
}

/// Area of the image modal.
pub fn modal_area(area: Rect) -> Rect {
    centered_rect(70, 60, area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_layout_split() {
        let layout = home_layout(Rect::new(0, 0, 80, 24), false);
        assert_eq!(layout.hero.height, HERO_HEIGHT);
        assert_eq!(layout.status.y, 23);
        let upload = layout.upload.unwrap();
        assert_eq!(layout.chat.width + upload.width, 80);
        assert_eq!(upload.x, layout.chat.width);
    }

    #[test]
    fn test_expanded_chat_takes_full_width() {
        let layout = home_layout(Rect::new(0, 0, 80, 24), true);
        assert!(layout.upload.is_none());
        assert_eq!(layout.chat.width, 80);
    }

    #[test]
    fn test_centered_fixed_clamps() {
        let rect = centered_fixed(100, 50, Rect::new(0, 0, 40, 10));
        assert_eq!(rect, Rect::new(0, 0, 40, 10));
    }
}
