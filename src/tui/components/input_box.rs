//! # InputBox Component
//!
//! Single-line text field at the bottom of the screen.
//!
//! ## Responsibilities
//!
//! - Capture text input and editing keys
//! - Emit `Submit` on Enter (the parent hands the buffer to `ChatSession::send`)
//! - Scroll horizontally so the cursor stays visible
//! - Show a dim placeholder while empty
//!
//! Cursor position is a byte offset into `buffer`, always on a char boundary.
//! Horizontal scroll is measured in terminal columns via `unicode-width`, so
//! wide characters take two cells.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

pub const PLACEHOLDER: &str = "Ask me anything...";

/// Columns consumed by borders (1 + 1) and horizontal padding (1 + 1).
const HORIZONTAL_OVERHEAD: u16 = 4;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Enter pressed; the buffer is left for the parent to consume
    Submit,
    ContentChanged,
}

pub struct InputBox {
    pub buffer: String,
    /// Byte offset of the cursor in `buffer`
    cursor: usize,
    /// First visible display column
    scroll: usize,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            scroll: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Pulls the cursor back inside the buffer after it was changed from outside
    /// (e.g. cleared by `ChatSession::send`).
    pub fn clamp_cursor(&mut self) {
        if self.cursor > self.buffer.len() {
            self.cursor = self.buffer.len();
        }
        if self.buffer.is_empty() {
            self.scroll = 0;
        }
    }

    fn cursor_column(&self) -> usize {
        self.buffer[..self.cursor].width()
    }

    /// Adjusts `scroll` so the cursor column lies within `[scroll, scroll + width)`.
    fn update_scroll(&mut self, width: usize) {
        if width == 0 {
            self.scroll = 0;
            return;
        }
        let column = self.cursor_column();
        if column < self.scroll {
            self.scroll = column;
        } else if column >= self.scroll + width {
            self.scroll = column + 1 - width;
        }
    }

    /// The slice of the buffer that fits in `width` columns starting at `scroll`.
    fn visible_text(&self, width: usize) -> String {
        let mut column = 0;
        let mut visible = String::new();
        for c in self.buffer.chars() {
            let char_width = c.width().unwrap_or(0);
            if column >= self.scroll {
                if column + char_width > self.scroll + width {
                    break;
                }
                visible.push(c);
            }
            column += char_width;
        }
        visible
    }

    fn insert_str(&mut self, text: &str) {
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
    }
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(text.len())
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(HORIZONTAL_OVERHEAD) as usize;
        self.update_scroll(width);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .padding(Padding::horizontal(1));

        let input = if self.buffer.is_empty() {
            Paragraph::new(PLACEHOLDER).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )
        } else {
            Paragraph::new(self.visible_text(width)).style(Style::default().fg(Color::Green))
        };

        let inner = block.inner(area);
        frame.render_widget(input.block(block), area);

        if inner.width > 0 && inner.height > 0 {
            let offset = (self.cursor_column() - self.scroll) as u16;
            frame.set_cursor_position((inner.x + offset.min(inner.width - 1), inner.y));
        }
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                // Single line: pasted newlines become spaces
                let flattened: String = text
                    .chars()
                    .filter(|c| *c != '\r')
                    .map(|c| if c == '\n' { ' ' } else { c })
                    .collect();
                self.insert_str(&flattened);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => (self.cursor > 0).then(|| {
                let prev = prev_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                InputEvent::ContentChanged
            }),
            TuiEvent::Delete => (self.cursor < self.buffer.len()).then(|| {
                let next = next_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(self.cursor..next);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorLeft => (self.cursor > 0).then(|| {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorRight => (self.cursor < self.buffer.len()).then(|| {
                self.cursor = next_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorHome => (self.cursor != 0).then(|| {
                self.cursor = 0;
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorEnd => (self.cursor != self.buffer.len()).then(|| {
                self.cursor = self.buffer.len();
                InputEvent::ContentChanged
            }),
            TuiEvent::Submit => Some(InputEvent::Submit),
            _ => None,
        }
    }
}
