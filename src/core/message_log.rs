//! # Message Log
//!
//! Ordered sequence of [`Message`]s. Insertion order is display order.
//!
//! The log supports exactly two mutations:
//!
//! ```text
//! append(msg)        grows by one at the end
//! remove_pending()   shrinks by one (the placeholder), or does nothing
//! ```
//!
//! Both are `pub(crate)`: only `ChatSession` mutates the log. Everyone else
//! gets a shared reference.

use crate::core::message::Message;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes the pending placeholder. Returns `false` if there was none.
    pub(crate) fn remove_pending(&mut self) -> bool {
        match self.pending_index() {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Position of the pending placeholder, if present.
    pub fn pending_index(&self) -> Option<usize> {
        self.messages.iter().position(Message::is_pending)
    }

    pub fn has_pending(&self) -> bool {
        self.pending_index().is_some()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        assert!(!log.has_pending());
    }

    #[test]
    fn remove_pending_without_placeholder_is_noop() {
        let mut log = MessageLog::new();
        log.append(Message::me("hello"));
        assert!(!log.remove_pending());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn remove_pending_from_middle_keeps_order() {
        let mut log = MessageLog::new();
        log.append(Message::me("a"));
        log.append(Message::pending());
        log.append(Message::me("b"));

        assert_eq!(log.pending_index(), Some(1));
        assert!(log.remove_pending());
        assert_eq!(log.as_slice(), &[Message::me("a"), Message::me("b")]);
    }
}
