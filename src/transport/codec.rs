//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Two layers, one frame:
//!
//! ```text
//! 4 2 ["message","hi there"]
//! │ │ └─ JSON data
//! │ └─── Socket.IO packet type (2 = event)
//! └───── Engine.IO packet type (4 = message)
//! ```
//!
//! Socket.IO packets look like
//! `<type>[<attachments>-][<namespace>,][<ack id>][<json>]`. The default
//! namespace `/` is omitted on the wire. Binary packets are recognised but
//! not decoded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TransportError;

/// Namespace used when a packet names none.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    /// Carries an encoded Socket.IO packet.
    Message(String),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
    /// Binary event (5) or binary ack (6). Attachments are not supported.
    Binary(u8),
}

impl SocketPacket {
    fn type_digit(&self) -> u8 {
        match self {
            SocketPacket::Connect { .. } => 0,
            SocketPacket::Disconnect { .. } => 1,
            SocketPacket::Event { .. } => 2,
            SocketPacket::Ack { .. } => 3,
            SocketPacket::ConnectError { .. } => 4,
            SocketPacket::Binary(kind) => *kind,
        }
    }
}

// ============================================================================
// Engine.IO layer
// ============================================================================

pub fn decode_engine(frame: &str) -> Result<EnginePacket, TransportError> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| TransportError::Protocol("empty engine.io frame".to_string()))?;
    let data = chars.as_str();

    match kind {
        '0' => serde_json::from_str(data)
            .map(EnginePacket::Open)
            .map_err(|e| TransportError::Protocol(format!("bad open packet: {e}"))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(data.to_string())),
        '3' => Ok(EnginePacket::Pong(data.to_string())),
        '4' => Ok(EnginePacket::Message(data.to_string())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(TransportError::Protocol(format!(
            "unknown engine.io packet type '{other}'"
        ))),
    }
}

pub fn encode_engine(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(handshake) => {
            // OpenHandshake only holds strings and integers; serialization cannot fail.
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(data) => format!("2{data}"),
        EnginePacket::Pong(data) => format!("3{data}"),
        EnginePacket::Message(data) => format!("4{data}"),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    }
}

// ============================================================================
// Socket.IO layer
// ============================================================================

pub fn decode_socket(data: &str) -> Result<SocketPacket, TransportError> {
    let mut chars = data.chars();
    let kind = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| TransportError::Protocol(format!("bad socket.io packet: {data:?}")))?
        as u8;
    let mut rest = chars.as_str();

    if kind == 5 || kind == 6 {
        return Ok(SocketPacket::Binary(kind));
    }

    let namespace = if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => {
                let ns = &rest[..idx];
                rest = &rest[idx + 1..];
                ns.to_string()
            }
            None => {
                let ns = rest.to_string();
                rest = "";
                ns
            }
        }
    } else {
        DEFAULT_NAMESPACE.to_string()
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let ack_id = if digits > 0 {
        let id = rest[..digits]
            .parse::<u64>()
            .map_err(|e| TransportError::Protocol(format!("bad ack id: {e}")))?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    let json = if rest.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(rest)
                .map_err(|e| TransportError::Protocol(format!("bad packet data: {e}")))?,
        )
    };

    match kind {
        0 => Ok(SocketPacket::Connect {
            namespace,
            data: json,
        }),
        1 => Ok(SocketPacket::Disconnect { namespace }),
        2 => {
            let mut items = match json {
                Some(Value::Array(items)) => items,
                other => {
                    return Err(TransportError::Protocol(format!(
                        "event data must be an array, got {other:?}"
                    )));
                }
            };
            if items.is_empty() {
                return Err(TransportError::Protocol("event without a name".to_string()));
            }
            let name = match items.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(TransportError::Protocol(format!(
                        "event name must be a string, got {other}"
                    )));
                }
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args: items,
            })
        }
        3 => {
            let ack_id = ack_id
                .ok_or_else(|| TransportError::Protocol("ack without an id".to_string()))?;
            let args = match json {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            Ok(SocketPacket::Ack {
                namespace,
                ack_id,
                args,
            })
        }
        4 => Ok(SocketPacket::ConnectError {
            namespace,
            data: json,
        }),
        other => Err(TransportError::Protocol(format!(
            "unknown socket.io packet type {other}"
        ))),
    }
}

pub fn encode_socket(packet: &SocketPacket) -> String {
    let mut out = packet.type_digit().to_string();

    let namespace = match packet {
        SocketPacket::Connect { namespace, .. }
        | SocketPacket::Disconnect { namespace }
        | SocketPacket::Event { namespace, .. }
        | SocketPacket::Ack { namespace, .. }
        | SocketPacket::ConnectError { namespace, .. } => namespace.as_str(),
        SocketPacket::Binary(_) => DEFAULT_NAMESPACE,
    };
    if namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }

    match packet {
        SocketPacket::Connect { data, .. } | SocketPacket::ConnectError { data, .. } => {
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
        }
        SocketPacket::Disconnect { .. } | SocketPacket::Binary(_) => {}
        SocketPacket::Event {
            ack_id, name, args, ..
        } => {
            if let Some(id) = ack_id {
                out.push_str(&id.to_string());
            }
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            out.push_str(&Value::Array(items).to_string());
        }
        SocketPacket::Ack { ack_id, args, .. } => {
            out.push_str(&ack_id.to_string());
            out.push_str(&Value::Array(args.clone()).to_string());
        }
    }

    out
}

// ============================================================================
// Frame helpers
// ============================================================================

/// Full websocket frame for a Socket.IO packet.
pub fn socket_frame(packet: &SocketPacket) -> String {
    encode_engine(&EnginePacket::Message(encode_socket(packet)))
}

/// `40`: connect to the default namespace.
pub fn connect_frame() -> String {
    socket_frame(&SocketPacket::Connect {
        namespace: DEFAULT_NAMESPACE.to_string(),
        data: None,
    })
}

/// `41`: leave the default namespace.
pub fn disconnect_frame() -> String {
    socket_frame(&SocketPacket::Disconnect {
        namespace: DEFAULT_NAMESPACE.to_string(),
    })
}

/// `42["<name>",<payload>]` on the default namespace.
pub fn event_frame(name: &str, payload: Value) -> String {
    socket_frame(&SocketPacket::Event {
        namespace: DEFAULT_NAMESPACE.to_string(),
        ack_id: None,
        name: name.to_string(),
        args: vec![payload],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let packet = decode_engine(frame).unwrap();
        match packet {
            EnginePacket::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.ping_interval, 25000);
                assert_eq!(handshake.ping_timeout, 20000);
                assert_eq!(handshake.max_payload, Some(1_000_000));
            }
            other => panic!("expected open packet, got {other:?}"),
        }
    }

    #[test]
    fn decodes_heartbeat_and_control_packets() {
        assert_eq!(decode_engine("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(decode_engine("3probe").unwrap(), EnginePacket::Pong("probe".into()));
        assert_eq!(decode_engine("1").unwrap(), EnginePacket::Close);
        assert_eq!(decode_engine("6").unwrap(), EnginePacket::Noop);
    }

    #[test]
    fn rejects_empty_and_unknown_engine_frames() {
        assert!(matches!(decode_engine(""), Err(TransportError::Protocol(_))));
        assert!(matches!(decode_engine("9"), Err(TransportError::Protocol(_))));
        assert!(matches!(decode_engine("0not json"), Err(TransportError::Protocol(_))));
    }

    #[test]
    fn decodes_string_event() {
        let packet = decode_socket(r#"2["message","hi there"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".into(),
                ack_id: None,
                name: "message".into(),
                args: vec![json!("hi there")],
            }
        );
    }

    #[test]
    fn decodes_event_with_namespace_and_ack_id() {
        let packet = decode_socket(r#"2/admin,12["message",{"message":"hi"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/admin".into(),
                ack_id: Some(12),
                name: "message".into(),
                args: vec![json!({"message": "hi"})],
            }
        );
    }

    #[test]
    fn decodes_connect_ack_and_error() {
        assert_eq!(
            decode_socket(r#"0{"sid":"abc"}"#).unwrap(),
            SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({"sid": "abc"})),
            }
        );
        assert_eq!(
            decode_socket(r#"4{"message":"Not authorized"}"#).unwrap(),
            SocketPacket::ConnectError {
                namespace: "/".into(),
                data: Some(json!({"message": "Not authorized"})),
            }
        );
        assert_eq!(
            decode_socket("1/chat").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/chat".into()
            }
        );
    }

    #[test]
    fn binary_packets_are_flagged_not_decoded() {
        assert_eq!(
            decode_socket(r#"51-["upload",{"_placeholder":true,"num":0}]"#).unwrap(),
            SocketPacket::Binary(5)
        );
    }

    #[test]
    fn malformed_events_are_protocol_errors() {
        assert!(decode_socket(r#"2{"not":"array"}"#).is_err());
        assert!(decode_socket("2[]").is_err());
        assert!(decode_socket("2[42]").is_err());
        assert!(decode_socket("x").is_err());
        assert!(decode_socket("3[]").is_err());
    }

    #[test]
    fn encodes_client_frames() {
        assert_eq!(connect_frame(), "40");
        assert_eq!(disconnect_frame(), "41");
        assert_eq!(
            event_frame("user-message", json!("hello")),
            r#"42["user-message","hello"]"#
        );
        assert_eq!(encode_engine(&EnginePacket::Pong(String::new())), "3");
    }

    #[test]
    fn encodes_namespace_and_ack() {
        let packet = SocketPacket::Event {
            namespace: "/chat".into(),
            ack_id: Some(7),
            name: "message".into(),
            args: vec![json!(1), json!(2)],
        };
        let encoded = encode_socket(&packet);
        assert_eq!(encoded, r#"2/chat,7["message",1,2]"#);
        assert_eq!(decode_socket(&encoded).unwrap(), packet);
    }
}
