//! Home screen: hero banner, chat pane and roast-analysis pane.

use crate::app::{App, Focus};
use crate::screens::Screen;
use crate::ui::layout::home_layout;
use crate::ui::theme::{progress_bar, spinner, Styles, Symbols};
use crate::ui::widgets::{KeyHint, StatusBar};
use cafe_engine::{AnalysisResult, Chart, Message, Sender, UploadPhase};
use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// The home screen.
pub struct HomeScreen;

impl Screen for HomeScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let layout = home_layout(area, app.chat_expanded);

        render_hero(app, layout.hero, buf);
        render_chat(app, layout.chat, buf);
        if let Some(upload) = layout.upload {
            render_upload(app, upload, buf);
        }

        let hints = match app.focus {
            Focus::Chat => vec![
                KeyHint::new("Enter", "Send"),
                KeyHint::new("Tab", "Upload"),
                KeyHint::new("^E", "Expand"),
                KeyHint::new("F1", "Help"),
            ],
            Focus::Upload => vec![
                KeyHint::new("Enter", "Analyze"),
                KeyHint::new("^O", "Chart"),
                KeyHint::new("^X", "Clear"),
                KeyHint::new("F1", "Help"),
            ],
        };
        let mode = match app.focus {
            Focus::Chat => "Chat",
            Focus::Upload => "Upload",
        };
        let status_bar = StatusBar::new(mode).hints(hints);
        let status_bar = match &app.notification {
            Some(notification) => status_bar.right(notification, Styles::warning()),
            None => status_bar.right(app.conversation.status_text(), chat_status_style(app)),
        };
        status_bar.render(layout.status, buf);
    }
}

fn chat_status_style(app: &App) -> Style {
    if app.conversation.is_sending() {
        Styles::warning()
    } else if app.conversation.has_error() {
        Styles::error()
    } else {
        Styles::success()
    }
}

fn render_hero(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Styles::border())
        .style(Styles::default());
    let inner = block.inner(area);
    block.render(area, buf);

    let title = Line::from(vec![
        Span::styled(" CaféBot Roastery", Styles::highlight()),
        Span::styled("  specialty coffee, roasted every Monday", Styles::dim()),
    ]);
    let second = if app.hero.is_loaded() {
        let opacity = app.hero.hint_opacity();
        Line::from(Span::styled(
            " PgUp/PgDn to scroll the conversation",
            Styles::fading(opacity),
        ))
    } else {
        Line::from(Span::styled(
            format!(" Loading scene {}", spinner(app.tick)),
            Styles::dim(),
        ))
    };
    Paragraph::new(vec![title, second]).render(inner, buf);
}

fn pane_block(title: String, active: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(if active {
            Styles::border_active()
        } else {
            Styles::border()
        })
        .style(Styles::default())
}

fn message_lines(message: &Message) -> [Line<'static>; 2] {
    let (name, name_style) = match message.sender {
        Sender::User => ("You", Styles::user()),
        Sender::Bot => ("CaféBot", Styles::highlight()),
    };
    let text_style = if message.is_error {
        Styles::error()
    } else {
        Styles::default()
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    [
        Line::from(vec![
            Span::styled(format!("{name}: "), name_style),
            Span::styled(message.text.clone(), text_style),
        ]),
        Line::from(Span::styled(format!("  {time}"), Styles::faint())),
    ]
}

fn render_chat(app: &App, area: Rect, buf: &mut Buffer) {
    let title = if app.chat_expanded {
        " Chat with CaféBot [expanded] ".to_string()
    } else {
        " Chat with CaféBot ".to_string()
    };
    let block = pane_block(title, app.focus == Focus::Chat);
    let inner = block.inner(area);
    block.render(area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in app.conversation.messages() {
        lines.extend(message_lines(message));
    }
    if app.conversation.is_sending() {
        lines.push(Line::from(Span::styled(
            format!("CaféBot is typing {}", spinner(app.tick)),
            Styles::dim(),
        )));
    }

    let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });
    let total = u16::try_from(transcript.line_count(rows[0].width)).unwrap_or(u16::MAX);
    // Pinned to the bottom; scrolling moves back from there.
    let offset = total
        .saturating_sub(rows[0].height)
        .saturating_sub(app.transcript_scroll);
    transcript.scroll((offset, 0)).render(rows[0], buf);

    Paragraph::new(Line::from(Span::styled(
        format!("* {}", app.conversation.status_text()),
        chat_status_style(app),
    )))
    .render(rows[1], buf);

    app.input_state
        .widget()
        .focused(app.focus == Focus::Chat)
        .placeholder("Ask about coffee, brewing, origins...")
        .render(rows[2], buf);
}

/// Human-readable byte size.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn result_lines(result: &AnalysisResult) -> Vec<Line<'static>> {
    let mut roast = vec![
        Span::styled("Roast level: ", Styles::dim()),
        Span::styled(result.roast_level.clone(), Styles::highlight()),
    ];
    if result.is_simulated {
        roast.push(Span::styled(" (simulated)", Styles::dim()));
    }

    let mut lines = vec![
        Line::from(roast),
        Line::from(vec![
            Span::styled("Confidence: ", Styles::dim()),
            Span::styled(result.confidence_percent(), Styles::default()),
        ]),
    ];

    if let Some(brewing) = result.brewing_recommendation() {
        lines.push(Line::from(vec![
            Span::styled("Brewing: ", Styles::dim()),
            Span::styled(brewing.to_string(), Styles::default()),
        ]));
    }

    let probabilities: Vec<(&str, f64)> = result.class_probabilities().collect();
    if !probabilities.is_empty() {
        let label_width = probabilities
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        for (label, p) in probabilities {
            lines.push(Line::from(vec![
                Span::styled(format!("{label:<label_width$} "), Styles::dim()),
                Span::styled(progress_bar(p, 10), Styles::active()),
                Span::styled(format!(" {:.1}%", p * 100.0), Styles::default()),
            ]));
        }
    }

    match result.chart() {
        Chart::Available(_) => lines.push(Line::from(Span::styled(
            "Chart: press ^O to view",
            Styles::active(),
        ))),
        Chart::Insufficient => lines.push(Line::from(Span::styled(
            "Chart: insufficient data",
            Styles::dim(),
        ))),
        Chart::Missing => {}
    }
    lines
}

fn render_upload(app: &App, area: Rect, buf: &mut Buffer) {
    let upload = &app.upload;
    let title = if upload.is_dragging() {
        " Drop image here ".to_string()
    } else {
        " Roast analysis ".to_string()
    };
    let block = pane_block(title, app.focus == Focus::Upload || upload.is_dragging());
    let inner = block.inner(area);
    block.render(area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines = Vec::new();
    if let Some(selection) = upload.selection() {
        let file = &selection.file;
        lines.push(Line::from(vec![
            Span::styled("File: ", Styles::dim()),
            Span::styled(file.name.clone(), Styles::default()),
        ]));
        lines.push(Line::from(Span::styled(
            format!("{}, {}", file.mime, format_size(file.bytes.len())),
            Styles::dim(),
        )));
        lines.push(Line::from(Span::styled(
            selection.preview.url().to_string(),
            Styles::faint(),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Select an image of roasted beans.",
            Styles::dim(),
        )));
        lines.push(Line::from(Span::styled(
            "Type a path or paste a file.",
            Styles::dim(),
        )));
    }

    match upload.phase() {
        UploadPhase::Submitting => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Analyzing {}", spinner(app.tick)),
                Styles::warning(),
            )));
        }
        UploadPhase::Succeeded => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} Analysis complete", Symbols::CHECK),
                Styles::success(),
            )));
        }
        UploadPhase::FileSelected => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Press Enter to analyze", Styles::dim())));
        }
        UploadPhase::Empty => {}
    }

    if let Some(error) = upload.error() {
        lines.push(Line::from(Span::styled(
            format!("{} {error}", Symbols::ERROR),
            Styles::error(),
        )));
    }

    if let Some(result) = upload.result() {
        lines.push(Line::from(""));
        lines.extend(result_lines(result));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(rows[0], buf);

    app.path_input
        .widget()
        .focused(app.focus == Focus::Upload)
        .placeholder("path/to/beans.png")
        .render(rows[1], buf);
}
