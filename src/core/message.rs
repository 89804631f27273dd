//! # Messages
//!
//! The only entity in Astro. A [`Message`] is a piece of text plus who it
//! came from. The pending placeholder is modelled as a message too so the
//! presentation layer can render the whole log uniformly.

/// Fixed id carried by the pending placeholder so it can be located and removed.
pub const PENDING_ID: &str = "typing";

/// Text shown by the pending placeholder while a reply is outstanding.
pub const PENDING_TEXT: &str = "Thinking...";

/// Who a message came from. Determines rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// Typed by the local user.
    Me,
    /// Delivered by the backend.
    Remote,
    /// Synthetic "thinking" placeholder, not a real chat message.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    /// Only the pending placeholder has one (see [`PENDING_ID`]).
    pub id: Option<&'static str>,
}

impl Message {
    pub fn me(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Me,
            id: None,
        }
    }

    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Remote,
            id: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            text: PENDING_TEXT.to_string(),
            sender: Sender::Pending,
            id: Some(PENDING_ID),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id == Some(PENDING_ID)
    }
}
