//! Socket.IO client over a raw websocket.
//!
//! Connects straight to the websocket transport (no HTTP long-polling
//! upgrade dance), performs the Engine.IO/Socket.IO handshake, then hands the
//! socket to a background task:
//!
//! ```text
//!   emit() ──► outbound channel ──┐
//!                                 ▼
//!                        ┌─────────────────┐   ws frames   ┌─────────┐
//!                        │ connection task │ ◄───────────► │ server  │
//!                        └────────┬────────┘               └─────────┘
//!                                 │ events
//!                                 ▼
//!                      listener sinks (std mpsc)
//! ```
//!
//! The task answers server pings, gives up when the server stops pinging for
//! `pingInterval + pingTimeout`, and flips `is_connected` off on the way out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::codec::{
    DEFAULT_NAMESPACE, EnginePacket, OpenHandshake, SocketPacket, connect_frame, decode_engine,
    decode_socket, disconnect_frame, encode_engine, event_frame,
};
use super::{ListenerId, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `close()` waits for the connection task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Base server URL, e.g. `https://example.com` or `ws://localhost:3000`.
    pub url: String,
    /// Bound on TCP/TLS connect plus the whole handshake.
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Builds the Engine.IO websocket URL for a base server URL.
///
/// `http` maps to `ws` and `https` to `wss`. An empty or `/` path becomes the
/// standard `/socket.io/` mount point; any other path is kept as-is.
pub fn engine_io_url(base: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(base).map_err(|e| TransportError::InvalidUrl(format!("{base}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{other}' in {base}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(format!("cannot switch {base} to {scheme}")))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/socket.io/");
    }
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

enum Outbound {
    Frame(String),
    Close,
}

/// Registered listener sinks, keyed by event name.
#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, String, Sender<Value>)>,
}

impl Listeners {
    fn add(&mut self, event: &str, sink: Sender<Value>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, event.to_string(), sink));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Sends `payload` to every listener of `event`. Sinks whose receiver is
    /// gone are dropped. Returns how many listeners received it.
    fn dispatch(&mut self, event: &str, payload: &Value) -> usize {
        let mut delivered = 0;
        self.entries.retain(|(id, name, sink)| {
            if name != event {
                return true;
            }
            if sink.send(payload.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                debug!("Dropping listener {:?} for '{}': receiver gone", id, event);
                false
            }
        });
        delivered
    }
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SocketIoTransport {
    endpoint: String,
    sid: String,
    outbound: UnboundedSender<Outbound>,
    listeners: Arc<Mutex<Listeners>>,
    connected: Arc<AtomicBool>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SocketIoTransport {
    /// Connects and completes the handshake before returning, so a bad URL,
    /// an unreachable server or a rejected namespace surface here.
    pub async fn connect(options: &ConnectOptions) -> Result<Self, TransportError> {
        let url = engine_io_url(&options.url)?;
        info!("Connecting to {}", url);

        let (ws, handshake) = tokio::time::timeout(options.connect_timeout, open(&url))
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "timed out after {}s",
                    options.connect_timeout.as_secs()
                ))
            })??;

        info!(
            "Connected (sid={}, pingInterval={}ms, pingTimeout={}ms)",
            handshake.sid, handshake.ping_interval, handshake.ping_timeout
        );

        let heartbeat = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
        let (outbound, outbound_rx) = unbounded_channel();
        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(run_connection(
            ws,
            outbound_rx,
            listeners.clone(),
            connected.clone(),
            heartbeat,
        ));

        Ok(Self {
            endpoint: options.url.clone(),
            sid: handshake.sid,
            outbound,
            listeners,
            connected,
            task: tokio::sync::Mutex::new(Some(task)),
        })
    }

    /// Engine.IO session id assigned by the server.
    pub fn sid(&self) -> &str {
        &self.sid
    }
}

#[async_trait]
impl Transport for SocketIoTransport {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        debug!("Emitting '{}'", event);
        self.outbound
            .send(Outbound::Frame(event_frame(event, payload)))
            .map_err(|_| TransportError::Closed)
    }

    fn listen(&self, event: &str, sink: Sender<Value>) -> ListenerId {
        let id = lock(&self.listeners).add(event, sink);
        debug!("Listener {:?} attached to '{}'", id, event);
        id
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        let removed = lock(&self.listeners).remove(id);
        debug!("Listener {:?} detached: {}", id, removed);
        removed
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        let Some(mut handle) = self.task.lock().await.take() else {
            return;
        };
        info!("Closing connection to {}", self.endpoint);
        // The task also winds down if the channel is already closed.
        let _ = self.outbound.send(Outbound::Close);
        if tokio::time::timeout(CLOSE_GRACE, &mut handle).await.is_err() {
            warn!("Connection task did not stop within {:?}, aborting", CLOSE_GRACE);
            handle.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for SocketIoTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Opens the websocket and runs `0{...}` → `40` → `40{...}`.
async fn open(url: &Url) -> Result<(WsStream, OpenHandshake), TransportError> {
    let (mut ws, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    let handshake = loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Open(handshake) => break handshake,
            other => debug!("Ignoring {:?} before open packet", other),
        }
    };

    send_text(&mut ws, connect_frame()).await?;

    loop {
        match next_packet(&mut ws).await? {
            EnginePacket::Message(data) => match decode_socket(&data)? {
                SocketPacket::Connect { namespace, .. } if namespace == DEFAULT_NAMESPACE => {
                    return Ok((ws, handshake));
                }
                SocketPacket::ConnectError { data, .. } => {
                    return Err(TransportError::Rejected(describe_rejection(data)));
                }
                other => debug!("Ignoring {:?} during handshake", other),
            },
            EnginePacket::Ping(data) => {
                send_text(&mut ws, encode_engine(&EnginePacket::Pong(data))).await?;
            }
            EnginePacket::Close => {
                return Err(TransportError::Handshake(
                    "server closed the session during handshake".to_string(),
                ));
            }
            other => debug!("Ignoring {:?} during handshake", other),
        }
    }
}

async fn next_packet(ws: &mut WsStream) -> Result<EnginePacket, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return decode_engine(&text),
            Some(Ok(WsMessage::Close(_))) | None => {
                return Err(TransportError::Handshake(
                    "websocket closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::Connect(e.to_string())),
        }
    }
}

async fn send_text(ws: &mut WsStream, frame: String) -> Result<(), TransportError> {
    ws.send(WsMessage::Text(frame))
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))
}

/// Pulls a readable reason out of a `44{...}` payload.
fn describe_rejection(data: Option<Value>) -> String {
    match data {
        Some(Value::Object(map)) => match map.get("message") {
            Some(Value::String(msg)) => msg.clone(),
            _ => Value::Object(map).to_string(),
        },
        Some(Value::String(msg)) => msg,
        Some(other) => other.to_string(),
        None => "no reason given".to_string(),
    }
}

// ============================================================================
// Connection task
// ============================================================================

#[derive(Debug, PartialEq)]
enum FrameOutcome {
    Continue,
    Reply(String),
    Disconnected,
}

/// Handles one inbound text frame after the handshake.
fn handle_frame(text: &str, listeners: &Mutex<Listeners>) -> FrameOutcome {
    let packet = match decode_engine(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            return FrameOutcome::Continue;
        }
    };

    match packet {
        EnginePacket::Ping(data) => FrameOutcome::Reply(encode_engine(&EnginePacket::Pong(data))),
        EnginePacket::Close => {
            info!("Server closed the engine.io session");
            FrameOutcome::Disconnected
        }
        EnginePacket::Message(data) => match decode_socket(&data) {
            Ok(SocketPacket::Event {
                namespace,
                name,
                mut args,
                ..
            }) if namespace == DEFAULT_NAMESPACE => {
                let payload = if args.is_empty() {
                    Value::Null
                } else {
                    args.swap_remove(0)
                };
                let delivered = lock(listeners).dispatch(&name, &payload);
                debug!("Event '{}' delivered to {} listener(s)", name, delivered);
                FrameOutcome::Continue
            }
            Ok(SocketPacket::Disconnect { namespace }) if namespace == DEFAULT_NAMESPACE => {
                info!("Server disconnected the socket");
                FrameOutcome::Disconnected
            }
            Ok(SocketPacket::Binary(kind)) => {
                warn!("Ignoring binary socket.io packet (type {})", kind);
                FrameOutcome::Continue
            }
            Ok(other) => {
                debug!("Ignoring {:?}", other);
                FrameOutcome::Continue
            }
            Err(e) => {
                warn!("Dropping undecodable socket.io packet: {}", e);
                FrameOutcome::Continue
            }
        },
        other => {
            debug!("Ignoring {:?}", other);
            FrameOutcome::Continue
        }
    }
}

async fn run_connection(
    ws: WsStream,
    mut outbound: UnboundedReceiver<Outbound>,
    listeners: Arc<Mutex<Listeners>>,
    connected: Arc<AtomicBool>,
    heartbeat: Duration,
) {
    let (mut sink, mut stream) = ws.split();
    let watchdog = tokio::time::sleep(heartbeat);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                        warn!("Send failed, dropping connection: {}", e);
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(WsMessage::Text(disconnect_frame())).await;
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = stream.next() => {
                watchdog.as_mut().reset(tokio::time::Instant::now() + heartbeat);
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => match handle_frame(&text, &listeners) {
                        FrameOutcome::Continue => {}
                        FrameOutcome::Reply(frame) => {
                            if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                                warn!("Pong failed, dropping connection: {}", e);
                                break;
                            }
                        }
                        FrameOutcome::Disconnected => break,
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!("Websocket closed by server: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Websocket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Websocket stream ended");
                        break;
                    }
                }
            }
            _ = &mut watchdog => {
                warn!("No traffic from server for {:?}, dropping connection", heartbeat);
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    info!("Connection task finished");
}
