//! Single-line text input widget with history.
//!
//! The cursor is a character index, not a byte offset, so accented
//! input ("café", "envío") edits correctly.

use crate::ui::theme::Styles;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

/// Renders a [`TextInputState`].
#[derive(Debug, Clone)]
pub struct TextInput<'a> {
    content: &'a str,
    cursor: usize,
    block: Option<Block<'a>>,
    focused: bool,
    placeholder: Option<&'a str>,
    prompt: &'a str,
}

impl<'a> TextInput<'a> {
    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: &'a str) -> Self {
        self.prompt = prompt;
        self
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.height < 1 || inner.width < 1 {
            return;
        }

        let mut spans = vec![Span::styled(self.prompt, Styles::active())];

        if self.content.is_empty() {
            if self.focused {
                spans.push(Span::styled("_", Styles::active()));
            }
            if let Some(placeholder) = self.placeholder {
                spans.push(Span::styled(placeholder, Styles::dim()));
            }
            Paragraph::new(Line::from(spans)).render(inner, buf);
            return;
        }

        // Keep the cursor on screen by dropping characters from the left.
        let room = usize::from(inner.width)
            .saturating_sub(self.prompt.chars().count())
            .saturating_sub(1)
            .max(1);
        let skip = self.cursor.saturating_sub(room);

        let before: String = self.content.chars().skip(skip).take(self.cursor - skip).collect();
        let after: String = self.content.chars().skip(self.cursor).collect();

        spans.push(Span::styled(before, Styles::default()));
        if self.focused {
            spans.push(Span::styled(if after.is_empty() { "_" } else { "|" }, Styles::active()));
        }
        spans.push(Span::styled(after, Styles::default()));

        Paragraph::new(Line::from(spans))
            .style(Styles::default())
            .render(inner, buf);
    }
}

/// Content, cursor and submit history of an input line.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    content: String,
    /// Cursor position in characters.
    cursor: usize,
    history: Vec<String>,
    /// Position while browsing history, `None` when editing fresh input.
    history_index: Option<usize>,
    saved_input: String,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Take the content, clearing the state.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(chars)
            .map_or(self.content.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Insert a character at the cursor.
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    /// Insert a string at the cursor. Line breaks become spaces.
    pub fn insert_str(&mut self, s: &str) {
        let cleaned: String = s
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let at = self.byte_offset(self.cursor);
        self.content.insert_str(at, &cleaned);
        self.cursor += cleaned.chars().count();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_offset(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Take the content and remember it in history.
    pub fn submit(&mut self) -> String {
        let content = self.take();
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.history_index = None;
        self.saved_input.clear();
        content
    }

    /// Step back to an older history entry.
    pub fn history_prev(&mut self) {
        let next = match self.history_index {
            None if self.history.is_empty() => return,
            None => {
                self.saved_input = self.content.clone();
                0
            }
            Some(i) if i + 1 < self.history.len() => i + 1,
            Some(_) => return,
        };
        self.history_index = Some(next);
        self.content = self.history[self.history.len() - 1 - next].clone();
        self.move_end();
    }

    /// Step forward to a newer entry, ending at the input being edited.
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                self.history_index = None;
                self.content = std::mem::take(&mut self.saved_input);
                self.move_end();
            }
            Some(i) => {
                self.history_index = Some(i - 1);
                self.content = self.history[self.history.len() - i].clone();
                self.move_end();
            }
        }
    }

    /// Create a widget from this state.
    pub fn widget(&self) -> TextInput<'_> {
        TextInput {
            content: &self.content,
            cursor: self.cursor,
            block: None,
            focused: true,
            placeholder: None,
            prompt: "> ",
        }
    }
}
