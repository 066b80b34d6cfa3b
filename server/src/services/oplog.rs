//! Operation log — append-only, room-scoped sequence of strokes.
//!
//! DESIGN
//! ======
//! Entries are stored in sequence order and never removed or reordered.
//! Undo/redo only flip the `tombstone` flag of an existing entry. An opId
//! index gives constant-time lookup and enforces opId uniqueness at append
//! time, which is what makes lookup by opId alone unambiguous.

use std::collections::HashMap;

use strokes::{OpDraft, Operation};

use crate::services::room::RoomError;

#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Vec<Operation>,
    /// opId -> position in `entries`.
    index: HashMap<String, usize>,
    /// Last assigned sequence number; 0 means nothing appended yet.
    counter: u64,
}

impl OperationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp and append a draft, assigning the next sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::DuplicateOpId`] if the opId is already logged.
    /// The counter does not advance in that case.
    pub fn append(&mut self, draft: OpDraft, origin: &str) -> Result<&Operation, RoomError> {
        if self.index.contains_key(&draft.op_id) {
            return Err(RoomError::DuplicateOpId(draft.op_id));
        }
        self.counter += 1;
        let op = Operation::stamp(draft, self.counter, origin);
        let pos = self.entries.len();
        self.index.insert(op.op_id.clone(), pos);
        self.entries.push(op);
        Ok(&self.entries[pos])
    }

    #[must_use]
    pub fn find(&self, op_id: &str) -> Option<&Operation> {
        self.index.get(op_id).map(|&pos| &self.entries[pos])
    }

    /// Set the tombstone flag and return the updated entry.
    pub fn set_tombstone(&mut self, op_id: &str, tombstone: bool) -> Option<&Operation> {
        let pos = *self.index.get(op_id)?;
        let entry = &mut self.entries[pos];
        entry.tombstone = tombstone;
        Some(entry)
    }

    /// All entries in sequence order.
    #[must_use]
    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.counter
    }
}

#[cfg(test)]
#[path = "oplog_test.rs"]
mod tests;
