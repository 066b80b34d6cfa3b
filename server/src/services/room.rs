//! Room — sole mutation authority for one shared canvas.
//!
//! DESIGN
//! ======
//! A room owns its operation log, its member channels, and its presence
//! registry. Every method runs to completion without awaiting, and callers
//! hold the room's mutex for the whole call. Sequence assignment, log
//! append, tombstone flips, and the resulting fanout therefore happen as one
//! step, so members observe broadcasts in sequence order.
//!
//! UNDO / REDO
//! ===========
//! Each operation cycles `active -> tombstoned -> active`. Requests that do
//! not apply (unknown opId, already in the target state, refused by policy)
//! return a `RoomError` and change nothing; the gateway treats them as no-ops.
//! Lookup is by opId alone, which relies on the log rejecting duplicate opIds.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use strokes::{OpDraft, Operation, Point, ServerMessage, Snapshot, User};
use tracing::{debug, info, warn};

use crate::services::catchup::{self, CHECKPOINT_EVERY, SNAPSHOT_LIMIT};
use crate::services::fanout;
use crate::services::oplog::OperationLog;
use crate::services::policy::{Transition, UndoPolicy};
use crate::state::ClientTx;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("operation already logged: {0}")]
    DuplicateOpId(String),
    #[error("operation not found: {0}")]
    UnknownOp(String),
    #[error("operation already undone: {0}")]
    AlreadyTombstoned(String),
    #[error("operation is not undone: {0}")]
    AlreadyActive(String),
    #[error("{actor} may not {transition:?} {op_id}")]
    Denied { op_id: String, actor: String, transition: Transition },
}

impl RoomError {
    /// Grepable code for structured logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateOpId(_) => "E_DUPLICATE_OP",
            Self::UnknownOp(_) => "E_UNKNOWN_OP",
            Self::AlreadyTombstoned(_) => "E_ALREADY_UNDONE",
            Self::AlreadyActive(_) => "E_NOT_UNDONE",
            Self::Denied { .. } => "E_DENIED",
        }
    }
}

/// Snapshot captured every `CHECKPOINT_EVERY` sequence numbers.
#[derive(Debug, Clone, Serialize)]
pub struct Checkpoint {
    /// Last sequence number covered by the snapshot.
    pub seq: u64,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub name: String,
    pub members: usize,
    pub ops: usize,
    pub last_seq: u64,
}

pub struct Room {
    name: String,
    /// Connected members: `client_id` -> outbound channel.
    members: HashMap<String, ClientTx>,
    /// Presence entry per member, keyed by `client_id`.
    presence: BTreeMap<String, User>,
    log: OperationLog,
    checkpoint: Option<Checkpoint>,
    /// Set while the room has no members.
    empty_since: Option<Instant>,
}

/// Lock a room, recovering the guard if a previous holder panicked.
pub fn lock(room: &Mutex<Room>) -> MutexGuard<'_, Room> {
    room.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Room {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
            presence: BTreeMap::new(),
            log: OperationLog::new(),
            checkpoint: None,
            empty_since: Some(Instant::now()),
        }
    }

    #[cfg(test)]
    pub(crate) fn log(&self) -> &OperationLog {
        &self.log
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    #[cfg(test)]
    pub(crate) fn is_member(&self, client_id: &str) -> bool {
        self.members.contains_key(client_id)
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Register a member, send it the welcome handshake, then broadcast the
    /// full user list to everyone including the joiner.
    pub fn join(&mut self, client_id: &str, tx: ClientTx) {
        let user = User { id: client_id.to_owned(), name: client_id.to_owned(), color: random_color() };

        if !fanout::send_to(&tx, &catchup::welcome(client_id, &self.log)) {
            warn!(room = %self.name, %client_id, "welcome dropped: outbound queue unavailable");
        }

        self.members.insert(client_id.to_owned(), tx);
        self.presence.insert(client_id.to_owned(), user);
        self.empty_since = None;

        info!(room = %self.name, %client_id, members = self.members.len(), ops = self.log.len(), "client joined room");
        self.broadcast_users();
    }

    /// Remove a member and its presence entry. Returns false if it was not joined.
    pub fn leave(&mut self, client_id: &str) -> bool {
        let was_member = self.members.remove(client_id).is_some();
        self.presence.remove(client_id);
        if !was_member {
            return false;
        }

        if self.members.is_empty() {
            self.empty_since = Some(Instant::now());
        }
        info!(room = %self.name, %client_id, remaining = self.members.len(), "client left room");
        self.broadcast_users();
        true
    }

    /// Current presence list.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.presence.values().cloned().collect()
    }

    fn broadcast_users(&self) {
        fanout::broadcast_all(&self.members, &ServerMessage::UserList { users: self.users() });
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Sequence a completed stroke and broadcast the canonical copy to every
    /// member, the submitter included.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::DuplicateOpId`] if the opId is already logged.
    pub fn submit_op(&mut self, draft: OpDraft, origin: &str) -> Result<Operation, RoomError> {
        let op = self.log.append(draft, origin)?.clone();
        let delivered = fanout::broadcast_all(&self.members, &ServerMessage::OpBroadcast { op: op.clone() });
        debug!(room = %self.name, seq = op.seq, op_id = %op.op_id, %origin, delivered, "op sequenced");

        if op.seq % CHECKPOINT_EVERY == 0 {
            self.rebuild_checkpoint();
        }
        Ok(op)
    }

    /// Tombstone an active operation and broadcast its opId.
    ///
    /// # Errors
    ///
    /// [`RoomError::UnknownOp`], [`RoomError::AlreadyTombstoned`], or
    /// [`RoomError::Denied`]; the log is untouched in every case.
    pub fn request_undo(&mut self, op_id: &str, actor: &str, policy: &dyn UndoPolicy) -> Result<(), RoomError> {
        match self.log.find(op_id) {
            None => return Err(RoomError::UnknownOp(op_id.to_owned())),
            Some(op) if op.tombstone => return Err(RoomError::AlreadyTombstoned(op_id.to_owned())),
            Some(op) => check_policy(policy, actor, op, Transition::Undo)?,
        }

        self.log.set_tombstone(op_id, true);
        fanout::broadcast_all(&self.members, &ServerMessage::UndoBroadcast { op_id: op_id.to_owned() });
        debug!(room = %self.name, %op_id, %actor, "op undone");
        Ok(())
    }

    /// Restore a tombstoned operation and broadcast its full payload.
    ///
    /// # Errors
    ///
    /// [`RoomError::UnknownOp`], [`RoomError::AlreadyActive`], or
    /// [`RoomError::Denied`]; the log is untouched in every case.
    pub fn request_redo(&mut self, op_id: &str, actor: &str, policy: &dyn UndoPolicy) -> Result<(), RoomError> {
        match self.log.find(op_id) {
            None => return Err(RoomError::UnknownOp(op_id.to_owned())),
            Some(op) if !op.tombstone => return Err(RoomError::AlreadyActive(op_id.to_owned())),
            Some(op) => check_policy(policy, actor, op, Transition::Redo)?,
        }

        let Some(op) = self.log.set_tombstone(op_id, false).cloned() else {
            return Err(RoomError::UnknownOp(op_id.to_owned()));
        };
        fanout::broadcast_all(&self.members, &ServerMessage::RedoBroadcast { op });
        debug!(room = %self.name, %op_id, %actor, "op redone");
        Ok(())
    }

    // =========================================================================
    // TRANSIENT RELAY
    // =========================================================================

    /// Forward in-progress stroke points to every other member.
    pub fn relay_stroke_chunk(&self, from: &str, points: Vec<Point>) -> usize {
        let msg = ServerMessage::StrokeChunk { from: from.to_owned(), points };
        fanout::broadcast_except(&self.members, from, &msg)
    }

    /// Forward a pointer position to every other member.
    pub fn relay_cursor(&self, from: &str, x: f64, y: f64) -> usize {
        let msg = ServerMessage::Cursor { from: from.to_owned(), x, y };
        fanout::broadcast_except(&self.members, from, &msg)
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        catchup::build_snapshot(&self.log, SNAPSHOT_LIMIT)
    }

    #[must_use]
    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    #[must_use]
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            members: self.member_count(),
            ops: self.log.len(),
            last_seq: self.log.last_seq(),
        }
    }

    /// True if the room has had no members for at least `grace`.
    #[must_use]
    pub fn idle_for(&self, grace: Duration, now: Instant) -> bool {
        self.members.is_empty()
            && self
                .empty_since
                .is_some_and(|since| now.saturating_duration_since(since) >= grace)
    }

    fn rebuild_checkpoint(&mut self) {
        let snapshot = self.snapshot();
        let seq = self.log.last_seq();
        info!(room = %self.name, seq, active = snapshot.ops.len(), "checkpoint snapshot rebuilt");
        self.checkpoint = Some(Checkpoint { seq, snapshot });
    }
}

fn check_policy(policy: &dyn UndoPolicy, actor: &str, op: &Operation, transition: Transition) -> Result<(), RoomError> {
    if policy.permits(actor, op, transition) {
        Ok(())
    } else {
        Err(RoomError::Denied { op_id: op.op_id.clone(), actor: actor.to_owned(), transition })
    }
}

fn random_color() -> String {
    let rgb: u32 = rand::rng().random_range(0..=0x00FF_FFFF);
    format!("#{rgb:06x}")
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
