//! # MessageList Component
//!
//! Scrollable view of the conversation log.
//!
//! ## Responsibilities
//!
//! - Display the messages of a `MessageLog` in order
//! - Keep the view pinned to the newest message unless the user scrolled up
//! - Cache message heights between frames
//! - Show an empty-state hint before the first message
//!
//! `MessageList` is transient (created each frame) and wraps a
//! `&'a mut MessageListState` that lives in `TuiState`.

use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::message_log::MessageLog;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::Message;
use crate::tui::event::TuiEvent;

/// Shown in place of the list while the log is empty.
pub const EMPTY_STATE_TEXT: &str = "Start a conversation...";

/// Layout and scroll state for the message list.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Set during render when content exists below the viewport
    pub has_unseen_content: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            has_unseen_content: false,
            viewport_height: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.layout
            .total_height()
            .saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Re-engage auto-scroll once the user scrolls back down to the end.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }
}

/// Scrollable conversation view component.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub log: &'a MessageLog,
    pub pulse_value: f32,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut MessageListState, log: &'a MessageLog, pulse_value: f32) -> Self {
        Self {
            state,
            log,
            pulse_value,
        }
    }

    fn render_empty_state(&mut self, frame: &mut Frame, area: Rect) {
        self.state.layout = LayoutCache::new();
        self.state.scroll_state = ScrollViewState::default();
        self.state.stick_to_bottom = true;
        self.state.has_unseen_content = false;

        if area.height == 0 {
            return;
        }
        let hint_area = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
        let hint = Paragraph::new(EMPTY_STATE_TEXT)
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
        frame.render_widget(hint, hint_area);
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        if self.log.is_empty() {
            self.render_empty_state(frame, area);
            return;
        }

        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area

        // 1. Update layout cache
        let layout = &mut self.state.layout;
        let reusable = layout.reusable_count(self.log, content_width);
        layout.heights.truncate(reusable);
        for message in self.log.iter().skip(layout.heights.len()) {
            layout
                .heights
                .push(Message::calculate_height(message, content_width));
        }
        layout.rebuild_prefix_heights();
        layout.update_metadata(self.log, content_width);

        let total_height = self.state.layout.total_height();

        // 2. Clamp scroll offset to prevent overscrolling past content
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        // When pinned, lay out for where the view will land, not where it was.
        let scroll_offset = if self.state.stick_to_bottom {
            total_height.saturating_sub(area.height)
        } else {
            self.state.scroll_state.offset().y
        };
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible messages into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible_range.start > 0 {
            self.state.layout.prefix_heights[visible_range.start - 1]
        } else {
            0
        };

        for i in visible_range {
            // The canvas ends at u16::MAX rows; anything past it is not drawn.
            if y_offset == u16::MAX {
                break;
            }
            let (Some(message), Some(&height)) =
                (self.log.get(i), self.state.layout.heights.get(i))
            else {
                break;
            };
            let segment_rect = Rect::new(0, y_offset, content_width, height);
            scroll_view.render_widget(Message::new(message, self.pulse_value), segment_rect);
            y_offset = y_offset.saturating_add(height);
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);

        let max_y = total_height.saturating_sub(area.height);
        self.state.has_unseen_content =
            !self.state.stick_to_bottom && self.state.scroll_state.offset().y < max_y;
    }
}

/// Event handling lives on the state because `MessageList` is rebuilt every frame.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollToBottom => {
                self.stick_to_bottom = true;
                self.scroll_state.scroll_to_bottom();
            }
            _ => {}
        }
        None
    }
}

/// Cached layout measurements
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    message_count: usize,
    content_width: u16,
    /// Where the placeholder sat when heights were cached.
    pending_index: Option<usize>,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            message_count: 0,
            content_width: 0,
            pending_index: None,
        }
    }

    /// How many cached heights still describe the same messages.
    ///
    /// The log only grows at the end, except that the placeholder can be
    /// removed from the middle. Everything from the cached placeholder slot
    /// onward may therefore have shifted.
    pub fn reusable_count(&self, log: &MessageLog, content_width: u16) -> usize {
        if self.content_width != content_width || self.heights.is_empty() {
            return 0;
        }

        let mut reusable = self.message_count.min(log.len()).min(self.heights.len());
        if let Some(idx) = self.pending_index {
            reusable = reusable.min(idx);
        }
        reusable
    }

    pub fn update_metadata(&mut self, log: &MessageLog, content_width: u16) {
        self.message_count = log.len();
        self.content_width = content_width;
        self.pending_index = log.pending_index();
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message as ChatMessage;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn log_of(messages: Vec<ChatMessage>) -> MessageLog {
        let mut log = MessageLog::new();
        for message in messages {
            log.append(message);
        }
        log
    }

    fn render(state: &mut MessageListState, log: &MessageLog, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| MessageList::new(state, log, 0.0).render(f, f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_layout_cache_reusable() {
        let log = log_of(vec![ChatMessage::me("a"), ChatMessage::remote("b")]);
        let mut cache = LayoutCache::new();
        cache.heights = vec![3, 3];
        cache.update_metadata(&log, 80);

        assert_eq!(cache.reusable_count(&log, 80), 2);
        // Width changed → nothing reusable
        assert_eq!(cache.reusable_count(&log, 40), 0);

        let grown = log_of(vec![
            ChatMessage::me("a"),
            ChatMessage::remote("b"),
            ChatMessage::me("c"),
        ]);
        assert_eq!(cache.reusable_count(&grown, 80), 2);
    }

    #[test]
    fn test_placeholder_slot_is_never_reused() {
        let with_pending = log_of(vec![ChatMessage::me("hi"), ChatMessage::pending()]);
        let mut cache = LayoutCache::new();
        cache.heights = vec![3, 3];
        cache.update_metadata(&with_pending, 80);

        // Reply replaced the placeholder: index 1 now holds a different message.
        let replied = log_of(vec![
            ChatMessage::me("hi"),
            ChatMessage::remote("a long reply"),
        ]);
        assert_eq!(cache.reusable_count(&replied, 80), 1);
    }

    #[test]
    fn test_empty_log_shows_hint() {
        let mut state = MessageListState::new();
        let text = render(&mut state, &MessageLog::new(), 40, 10);
        assert!(text.contains(EMPTY_STATE_TEXT));
        assert!(!state.has_unseen_content);
    }

    #[test]
    fn test_renders_messages_in_order() {
        let log = log_of(vec![ChatMessage::me("hello"), ChatMessage::remote("world")]);
        let mut state = MessageListState::new();
        let text = render(&mut state, &log, 40, 10);

        let hello = text.find("hello").unwrap();
        let world = text.find("world").unwrap();
        assert!(hello < world);
        assert!(!text.contains(EMPTY_STATE_TEXT));
    }

    #[test]
    fn test_sticks_to_newest_message() {
        let messages = (0..10).map(|i| ChatMessage::remote(format!("msg{i}"))).collect();
        let log = log_of(messages);
        let mut state = MessageListState::new();
        let text = render(&mut state, &log, 40, 6);

        assert!(text.contains("msg9"));
        assert!(!text.contains("msg0"));
        assert!(!state.has_unseen_content);
    }

    #[test]
    fn test_scrolling_up_flags_unseen_content_and_bottom_repins() {
        let messages = (0..10).map(|i| ChatMessage::remote(format!("msg{i}"))).collect();
        let log = log_of(messages);
        let mut state = MessageListState::new();
        render(&mut state, &log, 40, 6);

        state.handle_event(&TuiEvent::ScrollPageUp);
        assert!(!state.stick_to_bottom);
        render(&mut state, &log, 40, 6);
        assert!(state.has_unseen_content);

        state.handle_event(&TuiEvent::ScrollToBottom);
        assert!(state.stick_to_bottom);
        let text = render(&mut state, &log, 40, 6);
        assert!(text.contains("msg9"));
        assert!(!state.has_unseen_content);
    }

    #[test]
    fn test_conversation_taller_than_canvas_renders() {
        let long_reply = vec!["word"; 2000].join(" ");
        let messages = (0..40).map(|_| ChatMessage::remote(long_reply.clone())).collect();
        let log = log_of(messages);
        let mut state = MessageListState::new();

        render(&mut state, &log, 10, 10);
        assert_eq!(state.layout.total_height(), u16::MAX);

        // Scrolled away from the bottom as well as pinned to it.
        state.handle_event(&TuiEvent::ScrollPageUp);
        render(&mut state, &log, 10, 10);
        assert!(!state.stick_to_bottom);
    }

    #[test]
    fn test_visible_range_covers_viewport() {
        let mut cache = LayoutCache::new();
        cache.heights = vec![3; 10];
        cache.rebuild_prefix_heights();

        let range = cache.visible_range(0, 6);
        assert_eq!(range.start, 0);
        assert!(range.end >= 2);

        let range = cache.visible_range(27, 3);
        assert_eq!(range.end, 10);
    }
}
