//! Shared stroke model and JSON message envelopes for realtime WS transport.
//!
//! This crate owns the wire representation used by both `server` and `cli`.
//! Every message is a JSON object tagged by its `type` field; operation
//! payloads use camelCase keys (`opId`, `userId`, ...).

pub mod replica;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use replica::Replica;

/// Error returned by [`decode_client`] and [`decode_server`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The text is not a JSON value.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope has no string `type` field.
    #[error("message has no `type` field")]
    MissingType,
    /// The `type` field names a message this side does not handle.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// The `type` is known but its fields do not match.
    #[error("malformed `{kind}` message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    /// A submitted operation carried an empty `opId`.
    #[error("operation has an empty opId")]
    EmptyOpId,
}

// =============================================================================
// STROKES
// =============================================================================

/// Drawing tool used for a stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Brush,
    Eraser,
}

/// One sampled pointer position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A completed stroke as submitted by a client, before the room stamps it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpDraft {
    /// Client-generated identifier, unique for the lifetime of a room.
    pub op_id: String,
    pub user_id: String,
    pub tool: Tool,
    pub color: String,
    pub width: f64,
    pub points: Vec<Point>,
}

/// Canonical operation as recorded in a room log.
///
/// Content fields never change after stamping; only `tombstone` flips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub op_id: String,
    pub user_id: String,
    pub tool: Tool,
    pub color: String,
    pub width: f64,
    pub points: Vec<Point>,
    /// Room-scoped sequence number, starting at 1.
    pub seq: u64,
    /// Client id of the connection that submitted the operation.
    pub origin: String,
    pub tombstone: bool,
}

impl Operation {
    /// Stamp a draft with its sequence number and origin. The result is active.
    #[must_use]
    pub fn stamp(draft: OpDraft, seq: u64, origin: impl Into<String>) -> Self {
        Self {
            op_id: draft.op_id,
            user_id: draft.user_id,
            tool: draft.tool,
            color: draft.color,
            width: draft.width,
            points: draft.points,
            seq,
            origin: origin.into(),
            tombstone: false,
        }
    }

    /// True when both operations carry identical stroke content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.op_id == other.op_id
            && self.user_id == other.user_id
            && self.tool == other.tool
            && self.color == other.color
            && (self.width - other.width).abs() < f64::EPSILON
            && self.points == other.points
    }
}

/// Presence entry for one connected client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Compacted view of the active operations in a room.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ops: Vec<Operation>,
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Messages sent by a client to its room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Completed stroke, to be sequenced by the room.
    ClientOp { op: OpDraft },
    /// In-progress points of a stroke still being drawn.
    StrokeChunk { points: Vec<Point> },
    Cursor { x: f64, y: f64 },
    Undo {
        #[serde(rename = "opId")]
        op_id: String,
    },
    Redo {
        #[serde(rename = "opId")]
        op_id: String,
    },
}

const CLIENT_TYPES: &[&str] = &["client_op", "stroke_chunk", "cursor", "undo", "redo"];

/// Messages sent by a room to its members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join handshake: identity, active snapshot, and the recent raw tail.
    Welcome {
        #[serde(rename = "clientId")]
        client_id: String,
        snapshot: Snapshot,
        ops: Vec<Operation>,
    },
    OpBroadcast { op: Operation },
    UndoBroadcast {
        #[serde(rename = "opId")]
        op_id: String,
    },
    /// Carries the full payload so receivers can re-render evicted strokes.
    RedoBroadcast { op: Operation },
    StrokeChunk { from: String, points: Vec<Point> },
    Cursor { from: String, x: f64, y: f64 },
    /// Full presence list, never a diff.
    UserList { users: Vec<User> },
}

const SERVER_TYPES: &[&str] = &[
    "welcome",
    "op_broadcast",
    "undo_broadcast",
    "redo_broadcast",
    "stroke_chunk",
    "cursor",
    "user_list",
];

impl ServerMessage {
    /// The `type` tag this message serializes with.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::OpBroadcast { .. } => "op_broadcast",
            Self::UndoBroadcast { .. } => "undo_broadcast",
            Self::RedoBroadcast { .. } => "redo_broadcast",
            Self::StrokeChunk { .. } => "stroke_chunk",
            Self::Cursor { .. } => "cursor",
            Self::UserList { .. } => "user_list",
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode one inbound client message.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for text that is not JSON,
/// [`DecodeError::MissingType`] / [`DecodeError::UnknownType`] for envelopes
/// this server does not recognize, and [`DecodeError::Malformed`] when a known
/// type carries the wrong fields.
pub fn decode_client(text: &str) -> Result<ClientMessage, DecodeError> {
    let msg: ClientMessage = decode_tagged(text, CLIENT_TYPES)?;
    if let ClientMessage::ClientOp { op } = &msg {
        if op.op_id.is_empty() {
            return Err(DecodeError::EmptyOpId);
        }
    }
    Ok(msg)
}

/// Decode one message received from the server.
///
/// # Errors
///
/// Same classification as [`decode_client`].
pub fn decode_server(text: &str) -> Result<ServerMessage, DecodeError> {
    decode_tagged(text, SERVER_TYPES)
}

fn decode_tagged<T>(text: &str, known: &[&str]) -> Result<T, DecodeError>
where
    T: serde::de::DeserializeOwned,
{
    let value: Value = serde_json::from_str(text)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(DecodeError::MissingType);
    };
    if !known.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_owned()));
    }
    let kind = kind.to_owned();
    serde_json::from_value(value).map_err(|source| DecodeError::Malformed { kind, source })
}

/// Encode a message as JSON text.
///
/// # Errors
///
/// Propagates `serde_json` serialization errors. The message types in this
/// crate only contain string keys, so this does not fail in practice.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
