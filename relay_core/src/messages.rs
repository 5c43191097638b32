//! Wire messages.
//!
//! Every frame is a JSON object with an `event` tag, an optional
//! `destination` code and an event-specific `data` payload.

use crate::codes::{Destination, OriginCode, ShareCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HEARTBEAT: &str = "HEARTBEAT";
pub const REQUEST_SHARE_CODE: &str = "REQUEST_SHARE_CODE";
/// Spelling still sent by older web clients
pub const REQUEST_SHARE_CODE_LEGACY: &str = "REQUIST_SHARE_CODE";
pub const CONNECTION_REQUEST: &str = "CONNECTION_REQUEST";
pub const CONNECTION_ACCEPT: &str = "CONNECTION_ACCEPT";
pub const FILE_CHUNK: &str = "FILE_CHUNK";

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    destination: Option<Destination>,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
}

/// `"data": null` is kept as `Some(Null)`; only a missing key is `None`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// One chunk of a file on its way to a destination.
///
/// The payload is relayed untouched; reassembly is the receiver's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    #[serde(default)]
    pub chunk: Value,
    pub chunk_index: u64,
    pub total_chunks: u64,
    #[serde(default)]
    pub file_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AcceptData {
    #[serde(default)]
    files: Option<Vec<Value>>,
}

/// A parsed client frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Heartbeat,
    RequestShareCode,
    ConnectionRequest {
        destination: Option<Destination>,
    },
    ConnectionAccept {
        destination: Option<OriginCode>,
        files: Vec<Value>,
    },
    FileChunk {
        destination: Option<OriginCode>,
        chunk: FileChunk,
    },
    /// Anything else: forwarded to the destination as-is
    Relay {
        event: String,
        destination: Option<OriginCode>,
        data: Option<Value>,
    },
}

impl InboundEvent {
    /// Parse a text frame. Errors mean the frame is malformed and should be
    /// dropped.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let Envelope {
            event,
            destination,
            data,
        } = serde_json::from_str(text)?;

        let event = match event.as_str() {
            HEARTBEAT => Self::Heartbeat,
            REQUEST_SHARE_CODE | REQUEST_SHARE_CODE_LEGACY => Self::RequestShareCode,
            CONNECTION_REQUEST => Self::ConnectionRequest { destination },
            CONNECTION_ACCEPT => {
                let accept = match data {
                    Some(Value::Null) | None => AcceptData::default(),
                    Some(data) => serde_json::from_value(data)?,
                };
                Self::ConnectionAccept {
                    destination: destination.map(Destination::into_origin_code),
                    files: accept.files.unwrap_or_default(),
                }
            }
            FILE_CHUNK => Self::FileChunk {
                destination: destination.map(Destination::into_origin_code),
                chunk: serde_json::from_value(data.unwrap_or(Value::Null))?,
            },
            _ => Self::Relay {
                event,
                destination: destination.map(Destination::into_origin_code),
                data,
            },
        };
        Ok(event)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatData {
    pub timestamp: u64,
}

/// Reply to the party that sent a CONNECTION_REQUEST
#[derive(Debug, Clone, Serialize)]
pub struct PairingReply {
    // Key spelling is what deployed clients read
    #[serde(rename = "AssignedOriginCOde", skip_serializing_if = "Option::is_none")]
    pub assigned_origin_code: Option<OriginCode>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptNotice {
    pub success: bool,
    pub files: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComplete {
    pub file_name: String,
}

/// Server-originated events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    Heartbeat {
        data: HeartbeatData,
    },
    ShareCode {
        data: ShareCode,
    },
    /// Both the ack to the requester (`data`) and the notice to the code
    /// owner (`origin`)
    ConnectionRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<OriginCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<PairingReply>,
    },
    ConnectionAccept {
        origin: OriginCode,
        data: AcceptNotice,
    },
    FileChunk {
        data: FileChunk,
    },
    FileComplete {
        data: FileComplete,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(ServerEvent),
    Relay {
        event: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        Self::Event(event)
    }
}

impl ServerMessage {
    pub fn heartbeat(timestamp: u64) -> Self {
        ServerEvent::Heartbeat {
            data: HeartbeatData { timestamp },
        }
        .into()
    }

    pub fn share_code(code: ShareCode) -> Self {
        ServerEvent::ShareCode { data: code }.into()
    }

    pub fn pairing_accepted(assigned: OriginCode) -> Self {
        ServerEvent::ConnectionRequest {
            origin: None,
            data: Some(PairingReply {
                assigned_origin_code: Some(assigned),
                success: true,
            }),
        }
        .into()
    }

    pub fn pairing_refused() -> Self {
        ServerEvent::ConnectionRequest {
            origin: None,
            data: Some(PairingReply {
                assigned_origin_code: None,
                success: false,
            }),
        }
        .into()
    }

    pub fn pairing_notice(origin: OriginCode) -> Self {
        ServerEvent::ConnectionRequest {
            origin: Some(origin),
            data: None,
        }
        .into()
    }

    pub fn connection_accepted(origin: OriginCode, files: Vec<Value>) -> Self {
        ServerEvent::ConnectionAccept {
            origin,
            data: AcceptNotice {
                success: true,
                files,
            },
        }
        .into()
    }

    pub fn file_chunk(chunk: FileChunk) -> Self {
        ServerEvent::FileChunk { data: chunk }.into()
    }

    pub fn file_complete(file_name: String) -> Self {
        ServerEvent::FileComplete {
            data: FileComplete { file_name },
        }
        .into()
    }

    pub fn relay(event: String, data: Option<Value>) -> Self {
        Self::Relay { event, data }
    }
}
