//! Screen definitions for the cafe TUI.

pub mod home;

use crate::app::App;
use crate::ui::layout::{centered_fixed, modal_area};
use crate::ui::theme::Styles;
use cafe_engine::{decode_chart, png_dimensions};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

/// Trait for screens that can be rendered.
pub trait Screen {
    /// Render the screen to the buffer.
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Render the help overlay.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer) {
    let help_text = r"
  Chat
    Enter             Send question
    Up/Down           Input history
    Ctrl+E            Expand/collapse chat
    PgUp/PgDn         Scroll transcript

  Roast analysis
    type a path       then Enter to select
    paste a file      drop it on the pane
    Enter             Analyze selected image
    Ctrl+O            View analysis chart
    Ctrl+X            Clear selection

  Tab switch pane   F1 help   Ctrl+C quit
";

    let width = 48.min(area.width.saturating_sub(4));
    let height = 20.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    Paragraph::new(help_text)
        .block(block)
        .style(Styles::default())
        .render(overlay_area, buf);
}

/// Render the image modal if it is open.
///
/// Terminals cannot show the PNG itself, so the modal describes it.
pub fn render_image_modal(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(image) = app.modal.image() else {
        return;
    };

    let overlay_area = modal_area(area);
    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(format!(" {} ", image.title))
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    let mut lines = vec![Line::from("")];
    match decode_chart(&image.data) {
        Ok(bytes) => {
            let description = match png_dimensions(&bytes) {
                Some((w, h)) => format!("PNG chart, {w} x {h} px"),
                None => "Chart image".to_string(),
            };
            lines.push(Line::from(Span::styled(description, Styles::highlight())));
            lines.push(Line::from(Span::styled(
                home::format_size(bytes.len()),
                Styles::dim(),
            )));
        }
        Err(e) => {
            lines.push(Line::from(Span::styled(
                format!("Could not decode chart: {e}"),
                Styles::error(),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc or click outside to close",
        Styles::dim(),
    )));

    Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .render(overlay_area, buf);
}
