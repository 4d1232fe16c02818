//! Engine.IO v4 / Socket.IO v5 text packet codec
//!
//! Only the websocket transport with text frames is supported. Layout:
//!
//! ```text
//! <engine type>[<socket type>[/<namespace>,][<ack id>][<json>]]
//! 0{"sid":..}        open            2 / 3     ping / pong
//! 40 / 40{"sid":..}  connect         44{..}    connect error
//! 42["name",{..}]    event           41        disconnect
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default namespace
pub const ROOT_NAMESPACE: &str = "/";

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("empty packet")]
    Empty,

    #[error("unknown engine packet type `{0}`")]
    UnknownEngineType(char),

    #[error("unknown socket packet type `{0}`")]
    UnknownSocketType(char),

    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),

    #[error("malformed packet: {0}")]
    Malformed(String),
}

/// Engine.IO handshake data
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    /// Milliseconds
    pub ping_interval: u64,
    /// Milliseconds
    pub ping_timeout: u64,
}

impl OpenInfo {
    /// Silence after which the connection is considered dead
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
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
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

/// Decode one text frame
pub fn decode(frame: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|e| CodecError::Malformed(format!("open: {e}"))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Err(CodecError::Unsupported("transport upgrade")),
        '6' => Ok(EnginePacket::Noop),
        other => Err(CodecError::UnknownEngineType(other)),
    }
}

fn decode_socket(packet: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let mut rest = chars.as_str();

    let namespace = if rest.starts_with('/') {
        let (ns, tail) = match rest.find(',') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        rest = tail;
        ns.to_string()
    } else {
        ROOT_NAMESPACE.to_string()
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let ack_id = if digits > 0 {
        let id = rest[..digits]
            .parse()
            .map_err(|e| CodecError::Malformed(format!("ack id: {e}")))?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut args: Vec<Value> = serde_json::from_str(rest)
                .map_err(|e| CodecError::Malformed(format!("event: {e}")))?;
            if args.is_empty() {
                return Err(CodecError::Malformed("event without name".into()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => return Err(CodecError::Malformed(format!("event name {other}"))),
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            })
        }
        '3' => Ok(SocketPacket::Ack {
            namespace,
            ack_id: ack_id.ok_or_else(|| CodecError::Malformed("ack without id".into()))?,
        }),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| match v {
                    Value::String(s) => Some(s),
                    Value::Object(map) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .unwrap_or_else(|| rest.to_string());
            Ok(SocketPacket::ConnectError { namespace, message })
        }
        '5' | '6' => Err(CodecError::Unsupported("binary packet")),
        other => Err(CodecError::UnknownSocketType(other)),
    }
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace == ROOT_NAMESPACE {
        String::new()
    } else {
        format!("{namespace},")
    }
}

/// Namespace connect request
pub fn encode_connect(namespace: &str) -> String {
    format!("40{}", namespace_prefix(namespace))
}

/// Reply to an engine ping, echoing its data
pub fn encode_pong(data: &str) -> String {
    format!("3{data}")
}

/// Event emit without acknowledgement
pub fn encode_event(namespace: &str, name: &str, payload: Option<Value>) -> String {
    let mut args = vec![Value::String(name.to_string())];
    args.extend(payload);
    format!("42{}{}", namespace_prefix(namespace), Value::Array(args))
}
