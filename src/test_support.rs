//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::session::{ChatSession, PendingPolicy};
use crate::transport::{ListenerId, Transport, TransportError};

/// An in-memory transport that records emits and lets tests push inbound events.
pub struct RecordingTransport {
    emitted: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<Vec<(ListenerId, String, Sender<Value>)>>,
    next_listener: AtomicUsize,
    unlisten_calls: AtomicUsize,
    fail_emits: AtomicBool,
    connected: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            emitted: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicUsize::new(0),
            unlisten_calls: AtomicUsize::new(0),
            fail_emits: AtomicBool::new(false),
            connected: AtomicBool::new(true),
        }
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    /// Makes every following `emit` fail with `TransportError::Closed`.
    pub fn fail_emits(&self, fail: bool) {
        self.fail_emits.store(fail, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Pushes an inbound event to every listener registered for `event`.
    pub fn deliver(&self, event: &str, payload: Value) {
        for (_, name, sink) in self.listeners.lock().unwrap().iter() {
            if name == event {
                let _ = sink.send(payload.clone());
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn unlisten_calls(&self) -> usize {
        self.unlisten_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "test"
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.fail_emits.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.emitted
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        Ok(())
    }

    fn listen(&self, event: &str, sink: Sender<Value>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst) as u64 + 1);
        self.listeners
            .lock()
            .unwrap()
            .push((id, event.to_string(), sink));
        id
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        self.unlisten_calls.fetch_add(1, Ordering::SeqCst);
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.set_connected(false);
    }
}

/// Creates a session over a fresh `RecordingTransport`.
pub fn test_session(policy: PendingPolicy) -> (ChatSession, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let session = ChatSession::new(transport.clone(), policy);
    (session, transport)
}
