//! # Transport
//!
//! The real-time channel between Astro and the backend. The session only
//! sees the [`Transport`] trait; the Socket.IO implementation lives in
//! [`socketio`] and its wire format in [`codec`].

pub mod codec;
pub mod socketio;

use std::fmt;
use std::sync::mpsc::Sender;

use async_trait::async_trait;
use serde_json::Value;

pub use socketio::{ConnectOptions, SocketIoTransport};

/// Outbound event carrying the user's text.
pub const USER_MESSAGE_EVENT: &str = "user-message";
/// Inbound event carrying the backend's reply.
pub const MESSAGE_EVENT: &str = "message";

/// Handle returned by [`Transport::listen`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug)]
pub enum TransportError {
    /// The endpoint could not be turned into a websocket URL.
    InvalidUrl(String),
    /// TCP/TLS/websocket connection failed or timed out.
    Connect(String),
    /// The server spoke something other than the expected handshake.
    Handshake(String),
    /// The server refused the namespace connection.
    Rejected(String),
    /// A frame could not be decoded.
    Protocol(String),
    /// The connection is gone; nothing can be sent.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "invalid server URL: {msg}"),
            TransportError::Connect(msg) => write!(f, "connection failed: {msg}"),
            TransportError::Handshake(msg) => write!(f, "handshake failed: {msg}"),
            TransportError::Rejected(msg) => write!(f, "connection rejected by server: {msg}"),
            TransportError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            TransportError::Closed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// A bidirectional, event-named messaging channel.
///
/// `emit` is fire-and-forget: it queues the event and returns without
/// waiting for delivery or for any reply. Inbound events are pushed into the
/// sinks registered with `listen`, from whatever task the transport runs on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short human-readable name (endpoint or "test").
    fn name(&self) -> &str;

    /// Queue an event for sending.
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    /// Register a sink for every inbound `event`. Payloads are the event's first argument.
    fn listen(&self, event: &str, sink: Sender<Value>) -> ListenerId;

    /// Detach a listener. Returns `false` if it was not registered.
    fn unlisten(&self, id: ListenerId) -> bool;

    fn is_connected(&self) -> bool;

    /// Disconnect gracefully and wait for the connection to wind down.
    async fn close(&self);
}
