//! # TUI Components
//!
//! ## Stateless (props-based)
//!
//! - `TitleBar`: title, endpoint, connection state, "↓ New" hint
//! - `Message`: one chat bubble
//!
//! ## Stateful (event-driven)
//!
//! - `InputBox`: single-line text field
//! - `MessageList`: scrollable log view with layout caching
//!
//! Each file holds the component's state, events, rendering, and tests.
//! Components get their data as props rather than reaching into
//! `ChatSession` themselves.

mod title_bar;
pub use title_bar::TitleBar;

pub mod input_box;
pub mod message;
pub use input_box::{InputBox, InputEvent};
pub mod message_list;
pub use message_list::{MessageList, MessageListState};
