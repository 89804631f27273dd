//! # Chat Session
//!
//! Owns the [`MessageLog`] and mediates between user input, the transport
//! and the log. Every log mutation goes through here.
//!
//! ```text
//!              send(input)                      on_server_message(payload)
//!   idle ─────────────────────► awaiting-reply ─────────────────────────► idle
//!         append me, emit,        (pending           remove pending,
//!         insert pending          placeholder)       append remote
//! ```
//!
//! There is no timeout: if the reply never comes the session stays in
//! awaiting-reply and the placeholder stays on screen.
//!
//! The transport is injected at construction. Inbound payloads arrive on a
//! channel filled by the transport's own task; [`ChatSession::drain_inbound`]
//! applies them on the caller's thread so the log is only ever touched from
//! one place.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message_log::MessageLog;
use crate::core::message::Message;
use crate::core::payload;
use crate::transport::{ListenerId, MESSAGE_EVENT, Transport, USER_MESSAGE_EVENT};

/// What a second `send` does while a placeholder is already showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Insert only if absent: the existing placeholder stays where it is.
    #[default]
    Keep,
    /// Remove the existing placeholder and append a fresh one at the end.
    Refresh,
}

/// Identifies a change observer registered with [`ChatSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&MessageLog) + Send>;

pub struct ChatSession {
    transport: Arc<dyn Transport>,
    log: MessageLog,
    policy: PendingPolicy,
    inbound: Receiver<Value>,
    listener: Option<ListenerId>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl ChatSession {
    /// Creates a session with an empty log and attaches the inbound listener.
    pub fn new(transport: Arc<dyn Transport>, policy: PendingPolicy) -> Self {
        let (tx, inbound) = mpsc::channel();
        let listener = transport.listen(MESSAGE_EVENT, tx);
        info!(
            "Session started on {} (pending policy: {:?})",
            transport.name(),
            policy
        );
        Self {
            transport,
            log: MessageLog::new(),
            policy,
            inbound,
            listener: Some(listener),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.log.has_pending()
    }

    /// Sends the contents of `input` and clears it.
    ///
    /// Whitespace-only input is ignored entirely: nothing is logged or sent
    /// and `input` is left as it was. A failed transmission is logged; the
    /// placeholder is still inserted and stays until a reply arrives.
    pub fn send(&mut self, input: &mut String) {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        let text = text.to_string();

        self.log.append(Message::me(text.clone()));
        input.clear();

        if let Err(e) = self
            .transport
            .emit(USER_MESSAGE_EVENT, Value::String(text))
        {
            warn!("Failed to send user message: {}", e);
        }

        match self.policy {
            PendingPolicy::Keep => {
                if !self.log.has_pending() {
                    self.log.append(Message::pending());
                }
            }
            PendingPolicy::Refresh => {
                self.log.remove_pending();
                self.log.append(Message::pending());
            }
        }

        self.notify();
    }

    /// Applies one inbound `message` event: drops the placeholder (if any)
    /// and appends the normalized text as a remote message.
    pub fn on_server_message(&mut self, payload: Value) {
        let text = payload::normalize(&payload);
        if self.log.remove_pending() {
            debug!("Reply arrived, placeholder removed");
        }
        self.log.append(Message::remote(text));
        self.notify();
    }

    /// Applies every payload the transport has queued so far, in arrival
    /// order. Returns how many were applied.
    pub fn drain_inbound(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(payload) = self.inbound.try_recv() {
            self.on_server_message(payload);
            applied += 1;
        }
        applied
    }

    /// Registers a callback invoked with the log after every mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&MessageLog) + Send + 'static) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Detaches the inbound listener from the transport. Only the first call
    /// does anything; dropping the session calls this too.
    pub fn teardown(&mut self) {
        match self.listener.take() {
            Some(id) => {
                if !self.transport.unlisten(id) {
                    warn!("Inbound listener {:?} was already gone", id);
                }
                info!("Session torn down ({} messages)", self.log.len());
            }
            None => debug!("Session already torn down"),
        }
    }

    fn notify(&mut self) {
        for (_, observer) in &mut self.observers {
            observer(&self.log);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.teardown();
        }
    }
}
