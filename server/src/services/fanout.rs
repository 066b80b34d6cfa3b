//! Broadcast fanout — best-effort delivery to room members.
//!
//! DESIGN
//! ======
//! A message is serialized once and the shared text is handed to every
//! member's outbound channel with `try_send`. A full channel (slow or stalled
//! socket) or a closed one (connection going away) is skipped: there is no
//! queueing beyond the channel and no redelivery.

use std::collections::HashMap;
use std::sync::Arc;

use strokes::ServerMessage;
use tracing::warn;

use crate::state::ClientTx;

/// Deliver to every member. Returns how many members accepted the message.
pub fn broadcast_all(members: &HashMap<String, ClientTx>, msg: &ServerMessage) -> usize {
    deliver(members, msg, None)
}

/// Deliver to every member except `sender`.
pub fn broadcast_except(members: &HashMap<String, ClientTx>, sender: &str, msg: &ServerMessage) -> usize {
    deliver(members, msg, Some(sender))
}

/// Deliver to a single connection. Returns false if the send was dropped.
pub fn send_to(tx: &ClientTx, msg: &ServerMessage) -> bool {
    let Some(text) = serialize(msg) else {
        return false;
    };
    tx.try_send(text).is_ok()
}

fn deliver(members: &HashMap<String, ClientTx>, msg: &ServerMessage, exclude: Option<&str>) -> usize {
    let Some(text) = serialize(msg) else {
        return 0;
    };

    let mut delivered = 0;
    for (client_id, tx) in members {
        if exclude == Some(client_id.as_str()) {
            continue;
        }
        if tx.try_send(Arc::clone(&text)).is_ok() {
            delivered += 1;
        }
    }
    delivered
}

fn serialize(msg: &ServerMessage) -> Option<Arc<str>> {
    match strokes::encode(msg) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            warn!(error = %e, kind = msg.kind(), "fanout: failed to serialize message");
            None
        }
    }
}
