use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::session::ChatSession;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{MessageList, TitleBar};

/// Lays out one frame: title line, message list, input box.
pub fn draw_ui(frame: &mut Frame, session: &ChatSession, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(3)]);
    let [title_area, main_area, input_area] = layout.areas(frame.area());

    // List first: it decides whether anything is hidden below the viewport.
    MessageList::new(&mut tui.message_list, session.log(), tui.pulse_value)
        .render(frame, main_area);

    let transport = session.transport();
    TitleBar::new(
        transport.name().to_string(),
        transport.is_connected(),
        tui.message_list.has_unseen_content,
    )
    .render(frame, title_area);

    tui.input_box.render(frame, input_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::PendingPolicy;
    use crate::test_support::test_session;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(session: &ChatSession, tui: &mut TuiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|f| draw_ui(f, session, tui)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn fresh_session_shows_title_hint_and_placeholder() {
        let (session, _transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();
        let text = draw(&session, &mut tui);

        assert!(text.contains("Hey, Astro"));
        assert!(text.contains("| connected"));
        assert!(!text.contains("disconnected"));
        assert!(text.contains("Start a conversation..."));
        assert!(text.contains("Ask me anything..."));
    }

    #[test]
    fn sent_message_and_placeholder_are_drawn() {
        let (mut session, _transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();
        tui.input_box.buffer = "hello there".to_string();
        session.send(&mut tui.input_box.buffer);
        tui.input_box.clamp_cursor();

        let text = draw(&session, &mut tui);
        assert!(text.contains("hello there"));
        assert!(text.contains("Thinking..."));
        assert!(text.contains("Ask me anything..."));
    }

    #[test]
    fn reply_replaces_placeholder_on_screen() {
        let (mut session, transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();
        let mut input = "ping".to_string();
        session.send(&mut input);
        draw(&session, &mut tui);

        transport.deliver("message", serde_json::json!({ "message": "pong" }));
        session.drain_inbound();

        let text = draw(&session, &mut tui);
        assert!(text.contains("pong"));
        assert!(!text.contains("Thinking..."));
    }

    #[test]
    fn lost_connection_shows_in_title() {
        let (session, transport) = test_session(PendingPolicy::Keep);
        transport.set_connected(false);
        let mut tui = TuiState::new();
        let text = draw(&session, &mut tui);
        assert!(text.contains("disconnected"));
    }
}
