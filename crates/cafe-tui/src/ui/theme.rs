//! Theme and styling definitions for the cafe TUI.

use ratatui::style::{Color, Modifier, Style};

/// Roastery palette: dark espresso background, crema foreground.
pub struct Palette;

impl Palette {
    // Base colors
    pub const BG: Color = Color::Rgb(28, 22, 18);
    pub const FG: Color = Color::Rgb(236, 224, 206);
    pub const DIM: Color = Color::Rgb(150, 130, 112);
    pub const FAINT: Color = Color::Rgb(90, 76, 64);

    // Accent colors
    pub const ACCENT: Color = Color::Rgb(214, 160, 92);
    pub const USER: Color = Color::Rgb(160, 196, 220);

    // Status bar colors (high contrast)
    pub const STATUS_BG: Color = Color::Rgb(48, 38, 30);
    pub const STATUS_KEY_BG: Color = Color::Rgb(120, 80, 46);

    // Status colors
    pub const SUCCESS: Color = Color::Rgb(150, 200, 120);
    pub const WARNING: Color = Color::Rgb(240, 196, 96);
    pub const ERROR: Color = Color::Rgb(232, 108, 92);

    // Border colors
    pub const BORDER: Color = Color::Rgb(92, 72, 58);
    pub const BORDER_ACTIVE: Color = Color::Rgb(214, 160, 92);
}

/// Status indicator symbols (ASCII so every terminal renders them).
pub struct Symbols;

impl Symbols {
    pub const CHECK: &'static str = "[ok]";
    pub const ERROR: &'static str = "[x]";
    pub const SPINNER: [&'static str; 4] = ["|", "/", "-", "\\"];
}

/// Common styles used throughout the TUI.
pub struct Styles;

impl Styles {
    /// Default text style.
    pub fn default() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::BG)
    }

    /// Dimmed text for secondary information.
    pub fn dim() -> Style {
        Style::default().fg(Palette::DIM).bg(Palette::BG)
    }

    /// Barely visible text.
    pub fn faint() -> Style {
        Style::default().fg(Palette::FAINT).bg(Palette::BG)
    }

    /// Highlighted/selected item.
    pub fn highlight() -> Style {
        Style::default()
            .fg(Palette::ACCENT)
            .bg(Palette::BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Active/focused element.
    pub fn active() -> Style {
        Style::default().fg(Palette::ACCENT).bg(Palette::BG)
    }

    /// The user's own messages.
    pub fn user() -> Style {
        Style::default()
            .fg(Palette::USER)
            .bg(Palette::BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Palette::SUCCESS).bg(Palette::BG)
    }

    pub fn warning() -> Style {
        Style::default().fg(Palette::WARNING).bg(Palette::BG)
    }

    pub fn error() -> Style {
        Style::default().fg(Palette::ERROR).bg(Palette::BG)
    }

    /// Title style.
    pub fn title() -> Style {
        Style::default()
            .fg(Palette::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Key hint style (for status bar) - bright on dark for visibility.
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Palette::FG)
            .bg(Palette::STATUS_KEY_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Key hint label style - readable on status bar background.
    pub fn key_label() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::STATUS_BG)
    }

    /// Status bar background style.
    pub fn status_bar() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::STATUS_BG)
    }

    /// Border style for inactive elements.
    pub fn border() -> Style {
        Style::default().fg(Palette::BORDER)
    }

    /// Border style for active/focused elements.
    pub fn border_active() -> Style {
        Style::default().fg(Palette::BORDER_ACTIVE)
    }

    /// Style for text that fades out with `opacity` in `[0, 1]`.
    pub fn fading(opacity: f64) -> Style {
        if opacity > 0.66 {
            Self::dim()
        } else if opacity > 0.0 {
            Self::faint()
        } else {
            Style::default().fg(Palette::BG).bg(Palette::BG)
        }
    }
}

/// Progress bar rendering.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(empty))
}

/// Spinner frame for the given tick.
pub fn spinner(tick: usize) -> &'static str {
    Symbols::SPINNER[tick % Symbols::SPINNER.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 10), "[          ]");
        assert_eq!(progress_bar(0.5, 10), "[=====     ]");
        assert_eq!(progress_bar(1.0, 10), "[==========]");
        assert_eq!(progress_bar(1.5, 4), "[====]");
    }

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner(0), "|");
        assert_eq!(spinner(5), "/");
    }

    #[test]
    fn test_fading_hides_at_zero() {
        assert_eq!(Styles::fading(0.0).fg, Some(Palette::BG));
        assert_eq!(Styles::fading(1.0), Styles::dim());
    }
}
