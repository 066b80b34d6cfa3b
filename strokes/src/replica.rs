//! Client-side replica of one room's canvas.
//!
//! DESIGN
//! ======
//! The server is the only sequencing authority. A client draws speculatively
//! (`draw_local`), then reconciles when the canonical `op_broadcast` arrives
//! carrying the same `opId`. Every server message is applied by opId, so a
//! duplicate broadcast or an overlap between the welcome snapshot and its raw
//! tail never produces a duplicate stroke.

use std::collections::HashMap;

use crate::{OpDraft, Operation, ServerMessage, User};

#[derive(Debug, Default)]
pub struct Replica {
    client_id: Option<String>,
    /// Committed operations keyed by opId, tombstoned ones included.
    committed: HashMap<String, Operation>,
    /// Local strokes not yet echoed back by the room.
    pending: Vec<OpDraft>,
    users: Vec<User>,
}

impl Replica {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity assigned by the most recent welcome, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn pending(&self) -> &[OpDraft] {
        &self.pending
    }

    /// Look up a committed operation, tombstoned or not.
    #[must_use]
    pub fn get(&self, op_id: &str) -> Option<&Operation> {
        self.committed.get(op_id)
    }

    /// Record a stroke the local user just finished, ahead of the server echo.
    pub fn draw_local(&mut self, draft: OpDraft) {
        if self.committed.contains_key(&draft.op_id) || self.pending.iter().any(|p| p.op_id == draft.op_id) {
            return;
        }
        self.pending.push(draft);
    }

    /// Apply one message from the room.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Welcome { client_id, snapshot, ops } => {
                self.client_id = Some(client_id.clone());
                self.committed.clear();
                self.users.clear();
                for op in &snapshot.ops {
                    self.upsert(op.clone());
                }
                // The raw tail may overlap the snapshot and carries the
                // current tombstone flags; opId upserts make that safe.
                for op in ops {
                    self.upsert(op.clone());
                }
                let committed = &self.committed;
                self.pending.retain(|p| !committed.contains_key(&p.op_id));
            }
            ServerMessage::OpBroadcast { op } => {
                self.pending.retain(|p| p.op_id != op.op_id);
                if !self.committed.contains_key(&op.op_id) {
                    self.upsert(op.clone());
                }
            }
            ServerMessage::UndoBroadcast { op_id } => {
                if let Some(op) = self.committed.get_mut(op_id) {
                    op.tombstone = true;
                }
            }
            ServerMessage::RedoBroadcast { op } => {
                let mut op = op.clone();
                op.tombstone = false;
                self.upsert(op);
            }
            ServerMessage::UserList { users } => {
                self.users.clone_from(users);
            }
            ServerMessage::StrokeChunk { .. } | ServerMessage::Cursor { .. } => {}
        }
    }

    /// Active committed operations in canonical order.
    #[must_use]
    pub fn visible(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.committed.values().filter(|op| !op.tombstone).collect();
        ops.sort_by_key(|op| op.seq);
        ops
    }

    fn upsert(&mut self, op: Operation) {
        self.committed.insert(op.op_id.clone(), op);
    }
}

#[cfg(test)]
#[path = "replica_test.rs"]
mod tests;
