use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::message::{Message as ChatMessage, Sender};
use crate::tui::component::Component;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

/// Renders a single chat message as a bordered bubble.
///
/// Transient: created each frame by `MessageList` for the visible entries.
///
/// # Styling
///
/// - **Me** (blue, right-aligned title "you")
/// - **Remote** (yellow, title "astro")
/// - **Pending** (dark gray, italic, title "astro"): the placeholder shown
///   while a reply is outstanding. Its border breathes with `pulse_intensity`.
///
/// # Height Calculation
///
/// [`calculate_height`](Self::calculate_height) predicts the rendered height
/// with `textwrap` options that match `Paragraph` wrapping, so the list can lay
/// out the scroll canvas before rendering anything.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub message: &'a ChatMessage,
    /// Current pulse intensity (0.0 to 1.0); only affects the pending placeholder
    pub pulse_intensity: f32,
}

impl<'a> Message<'a> {
    pub fn new(message: &'a ChatMessage, pulse_intensity: f32) -> Self {
        Self {
            message,
            pulse_intensity,
        }
    }

    /// Calculate the height required for this message given a width.
    pub fn calculate_height(message: &ChatMessage, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Terminal too narrow for borders + padding; still occupy one row.
            return 1;
        }

        let content = message.text.trim();
        if content.is_empty() {
            return VERTICAL_OVERHEAD;
        }

        let options = textwrap::Options::new(content_width as usize)
            .break_words(true)
            .word_separator(textwrap::WordSeparator::AsciiSpace);

        let lines = textwrap::wrap(content, options);
        u16::try_from(lines.len())
            .unwrap_or(u16::MAX)
            .max(1)
            .saturating_add(VERTICAL_OVERHEAD)
    }

    pub fn label(sender: Sender) -> &'static str {
        match sender {
            Sender::Me => "you",
            Sender::Remote | Sender::Pending => "astro",
        }
    }

    pub fn style(sender: Sender) -> Style {
        match sender {
            Sender::Me => Style::default().fg(Color::Blue),
            Sender::Remote => Style::default().fg(Color::Yellow),
            Sender::Pending => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        }
    }
}

impl<'a> Widget for Message<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let sender = self.message.sender;
        let style = Self::style(sender);

        let mut border_style = style.add_modifier(Modifier::DIM);
        if sender == Sender::Pending {
            // Three-phase breathing: DIM → normal → BOLD
            if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
                border_style = border_style
                    .remove_modifier(Modifier::DIM)
                    .add_modifier(Modifier::BOLD);
            } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
                border_style = border_style.remove_modifier(Modifier::DIM);
            }
        }

        let title = Line::from(Self::label(sender));
        let (title, alignment) = match sender {
            Sender::Me => (title.right_aligned(), Alignment::Right),
            _ => (title, Alignment::Left),
        };

        let block = Block::bordered()
            .title(title)
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);

        Paragraph::new(self.message.text.trim())
            .style(style)
            .alignment(alignment)
            .wrap(Wrap { trim: true })
            .render(inner_area, buf);
    }
}

impl<'a> Component for Message<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
