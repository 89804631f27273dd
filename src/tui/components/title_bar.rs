//! # TitleBar Component
//!
//! Top status line: app title, server endpoint, connection state, and a
//! "↓ New" hint when there are messages below the scroll position.
//!
//! Purely presentational. All data comes in as props:
//!
//! ```text
//! Hey, Astro | https://host | connected | ↓ New
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::tui::component::Component;

pub const APP_TITLE: &str = "Hey, Astro";

pub struct TitleBar {
    /// Server endpoint as reported by the transport
    pub endpoint: String,
    pub connected: bool,
    /// Whether there's content below the current scroll position
    pub has_unseen_content: bool,
}

impl TitleBar {
    pub fn new(endpoint: String, connected: bool, has_unseen_content: bool) -> Self {
        Self {
            endpoint,
            connected,
            has_unseen_content,
        }
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let (status, status_style) = if self.connected {
            ("connected", Style::default().fg(Color::Green))
        } else {
            ("disconnected", Style::default().fg(Color::Red))
        };

        let mut spans = vec![
            Span::raw(APP_TITLE),
            Span::raw(" | "),
            Span::raw(self.endpoint.as_str()),
            Span::raw(" | "),
            Span::styled(status, status_style),
        ];
        if self.has_unseen_content {
            spans.push(Span::raw(" | ↓ New"));
        }

        frame.render_widget(Line::from(spans), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render_text(title_bar: &mut TitleBar) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).unwrap();
        terminal
            .draw(|f| {
                title_bar.render(f, f.area());
            })
            .unwrap();

        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_title_bar_connected() {
        let mut title_bar = TitleBar::new("https://example.test".to_string(), true, false);
        let text = render_text(&mut title_bar);

        assert!(text.contains("Hey, Astro"));
        assert!(text.contains("https://example.test"));
        assert!(text.contains("connected"));
        assert!(!text.contains("disconnected"));
        assert!(!text.contains("↓ New"));
    }

    #[test]
    fn test_title_bar_disconnected_with_unseen_content() {
        let mut title_bar = TitleBar::new("http://localhost:3000".to_string(), false, true);
        let text = render_text(&mut title_bar);

        assert!(text.contains("disconnected"));
        assert!(text.contains("↓ New"));
    }
}
