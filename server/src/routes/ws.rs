//! WebSocket gateway — one task per connection.
//!
//! DESIGN
//! ======
//! On upgrade, assigns a client identity, joins the room, and enters a
//! `select!` loop:
//! - Incoming client messages → decode + dispatch to the room
//! - Outbound frames queued by room fanout → forward to the socket
//!
//! Dispatch is synchronous: it decodes, locks the room, and runs one room
//! operation to completion. Nothing awaits while a room is locked.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → identity assigned → join (welcome, then `user_list` to all)
//! 2. Client sends messages → dispatch → room broadcasts
//! 3. Close or socket error → leave (presence rebroadcast) → identity freed
//!
//! Malformed messages, unknown types, and inapplicable undo/redo requests are
//! dropped without any reply to the sender.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use strokes::{ClientMessage, DecodeError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::services::room::{self, Room, RoomError};
use crate::services::{clients, directory};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// What dispatching one inbound message did. Used for logging and tests.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// A stroke was appended with this sequence number.
    Sequenced(u64),
    /// A transient message was forwarded to this many peers.
    Relayed(usize),
    /// An undo or redo flipped a tombstone flag.
    Flipped,
    /// The room refused the request; nothing changed.
    Rejected(RoomError),
    /// The message could not be decoded or has an unknown type.
    Dropped,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let room_name = params
        .get("room")
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map_or_else(|| state.config.default_room.clone(), str::to_owned);

    ws.on_upgrade(move |socket| run_ws(socket, state, room_name))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room_name: String) {
    let client_id = clients::register(&state, &room_name).await;

    // Per-connection channel for frames fanned out by the room.
    let (client_tx, mut client_rx) = mpsc::channel::<Arc<str>>(state.config.client_queue_capacity);
    let room = directory::join(&state, &room_name, &client_id, client_tx).await;

    info!(%client_id, room = %room_name, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        match process_inbound_text(&state, &room, &client_id, &text) {
                            Outcome::Rejected(e @ RoomError::Denied { .. }) => {
                                warn!(%client_id, code = e.code(), error = %e, "ws: request denied by policy");
                            }
                            Outcome::Rejected(e) => {
                                debug!(%client_id, code = e.code(), error = %e, "ws: request ignored");
                            }
                            _ => {}
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    directory::leave(&state, &room_name, &client_id).await;
    clients::release(&state, &client_id).await;
    info!(%client_id, room = %room_name, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode one inbound text message and apply it to the client's room.
fn process_inbound_text(state: &AppState, room: &Mutex<Room>, client_id: &str, text: &str) -> Outcome {
    let msg = match strokes::decode_client(text) {
        Ok(msg) => msg,
        Err(DecodeError::UnknownType(kind)) => {
            info!(%client_id, %kind, "ws: unknown message type");
            return Outcome::Dropped;
        }
        Err(e) => {
            debug!(%client_id, error = %e, "ws: malformed inbound message");
            return Outcome::Dropped;
        }
    };

    let mut room = room::lock(room);
    match msg {
        ClientMessage::ClientOp { op } => match room.submit_op(op, client_id) {
            Ok(op) => Outcome::Sequenced(op.seq),
            Err(e) => Outcome::Rejected(e),
        },
        ClientMessage::StrokeChunk { points } => Outcome::Relayed(room.relay_stroke_chunk(client_id, points)),
        ClientMessage::Cursor { x, y } => Outcome::Relayed(room.relay_cursor(client_id, x, y)),
        ClientMessage::Undo { op_id } => match room.request_undo(&op_id, client_id, state.policy.as_ref()) {
            Ok(()) => Outcome::Flipped,
            Err(e) => Outcome::Rejected(e),
        },
        ClientMessage::Redo { op_id } => match room.request_redo(&op_id, client_id, state.policy.as_ref()) {
            Ok(()) => Outcome::Flipped,
            Err(e) => Outcome::Rejected(e),
        },
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
