//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the session's
//! log, and routes keystrokes to the input box, the message list, or
//! `ChatSession::send`.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! - **Awaiting a reply**: draws every ~80ms so the placeholder border pulses.
//! - **Idle**: polls for input up to 250ms at a time and only redraws on
//!   terminal events, log changes, or a change in connection state.
//!
//! Inbound messages are applied with `ChatSession::drain_inbound` at the top
//! of every loop iteration, so the poll timeout bounds reply latency.

mod component;
mod components;
mod event;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;

use crate::core::config::ResolvedConfig;
use crate::core::session::ChatSession;
use crate::transport::Transport;
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const ANIMATION_POLL: Duration = Duration::from_millis(80);
const IDLE_POLL: Duration = Duration::from_millis(250);

/// TUI-specific presentation state (not part of the chat session)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub pulse_value: f32,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            pulse_value: 0.0,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock // blinking cursors stutter under continuous redraws
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, DisableBracketedPaste, Hide);
    }
}

/// Applies one terminal event. Returns `true` when the user asked to quit.
fn handle_event(tui: &mut TuiState, session: &mut ChatSession, event: TuiEvent) -> bool {
    match event {
        TuiEvent::Quit => return true,
        TuiEvent::Resize => {}
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown
        | TuiEvent::ScrollToBottom => {
            tui.message_list.handle_event(&event);
        }
        _ => {
            if let Some(InputEvent::Submit) = tui.input_box.handle_event(&event) {
                session.send(&mut tui.input_box.buffer);
                tui.input_box.clamp_cursor();
                // Sending always means the user wants to see the newest message.
                tui.message_list.handle_event(&TuiEvent::ScrollToBottom);
            }
        }
    }
    false
}

/// Runs the chat UI over `transport` until the user quits.
///
/// Blocks the calling thread. The transport's own task must be running on
/// another thread (the multi-threaded tokio runtime takes care of that).
pub fn run(transport: Arc<dyn Transport>, config: &ResolvedConfig) -> std::io::Result<()> {
    let mut session = ChatSession::new(transport, config.pending_policy);
    let mut tui = TuiState::new();

    let log_changed = Arc::new(AtomicBool::new(true));
    let observer_flag = log_changed.clone();
    let observer = session.subscribe(move |_| observer_flag.store(true, Ordering::SeqCst));

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = Instant::now();
    let mut needs_redraw = true;
    let mut was_connected = session.transport().is_connected();

    loop {
        let applied = session.drain_inbound();
        if applied > 0 {
            debug!("Applied {} inbound message(s)", applied);
        }
        if log_changed.swap(false, Ordering::SeqCst) {
            needs_redraw = true;
        }

        let connected = session.transport().is_connected();
        if connected != was_connected {
            if connected {
                info!("Connection restored");
            } else {
                warn!("Connection to {} lost", session.transport().name());
            }
            was_connected = connected;
            needs_redraw = true;
        }

        let animating = session.is_awaiting_reply();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            terminal.draw(|f| ui::draw_ui(f, &session, &mut tui))?;
            needs_redraw = false;
        }

        let timeout = if animating { ANIMATION_POLL } else { IDLE_POLL };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Drain everything queued before the next draw
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(&mut tui, &mut session, event) {
                should_quit = true;
                break;
            }
        }

        if should_quit {
            info!("Quit requested");
            break;
        }
    }

    session.unsubscribe(observer);
    session.teardown();

    ratatui::restore();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::PendingPolicy;
    use crate::test_support::test_session;
    use serde_json::json;

    fn type_line(tui: &mut TuiState, session: &mut ChatSession, text: &str) {
        for c in text.chars() {
            handle_event(tui, session, TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn enter_sends_trimmed_input_and_clears_the_box() {
        let (mut session, transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();

        type_line(&mut tui, &mut session, "  hi  ");
        assert!(!handle_event(&mut tui, &mut session, TuiEvent::Submit));

        assert!(tui.input_box.buffer.is_empty());
        assert_eq!(tui.input_box.cursor(), 0);
        assert_eq!(transport.emitted(), vec![("user-message".to_string(), json!("hi"))]);
        assert!(session.is_awaiting_reply());
    }

    #[test]
    fn enter_on_blank_input_does_nothing() {
        let (mut session, transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();

        type_line(&mut tui, &mut session, "   ");
        handle_event(&mut tui, &mut session, TuiEvent::Submit);

        assert_eq!(tui.input_box.buffer, "   ");
        assert!(transport.emitted().is_empty());
        assert!(session.log().is_empty());
    }

    #[test]
    fn quit_event_stops_the_loop() {
        let (mut session, _transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();
        assert!(handle_event(&mut tui, &mut session, TuiEvent::Quit));
    }

    #[test]
    fn scrolling_does_not_touch_the_input() {
        let (mut session, _transport) = test_session(PendingPolicy::Keep);
        let mut tui = TuiState::new();
        type_line(&mut tui, &mut session, "draft");

        handle_event(&mut tui, &mut session, TuiEvent::ScrollUp);
        assert!(!tui.message_list.stick_to_bottom);
        assert_eq!(tui.input_box.buffer, "draft");

        handle_event(&mut tui, &mut session, TuiEvent::Submit);
        assert!(tui.message_list.stick_to_bottom);
    }
}
