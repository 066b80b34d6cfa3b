//! Authorization hook for undo/redo transitions.
//!
//! DESIGN
//! ======
//! The room consults an `UndoPolicy` immediately before flipping a tombstone
//! flag. The default `PermitAll` lets any member undo or redo any operation
//! in the room. Policies run inside the room lock, so they must not block.

use std::sync::Arc;

use strokes::Operation;

/// Which tombstone transition is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Undo,
    Redo,
}

pub trait UndoPolicy: Send + Sync {
    /// Return true if `actor` may apply `transition` to `op`.
    fn permits(&self, actor: &str, op: &Operation, transition: Transition) -> bool;
}

/// Global, permission-less undo: every member may flip every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermitAll;

impl UndoPolicy for PermitAll {
    fn permits(&self, _actor: &str, _op: &Operation, _transition: Transition) -> bool {
        true
    }
}

/// Only the connection that submitted an operation may undo or redo it.
#[derive(Debug, Default, Clone, Copy)]
pub struct OriginOnly;

impl UndoPolicy for OriginOnly {
    fn permits(&self, actor: &str, op: &Operation, _transition: Transition) -> bool {
        op.origin == actor
    }
}

/// Policy selector used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoPolicyKind {
    PermitAll,
    OriginOnly,
}

impl UndoPolicyKind {
    /// Parse a config value (`permit_all` / `origin_only`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "permit_all" => Some(Self::PermitAll),
            "origin_only" => Some(Self::OriginOnly),
            _ => None,
        }
    }

    #[must_use]
    pub fn build(self) -> Arc<dyn UndoPolicy> {
        match self {
            Self::PermitAll => Arc::new(PermitAll),
            Self::OriginOnly => Arc::new(OriginOnly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strokes::{OpDraft, Tool};

    fn op_from(origin: &str) -> Operation {
        let draft = OpDraft {
            op_id: "u1".into(),
            user_id: "local".into(),
            tool: Tool::Pen,
            color: "#000".into(),
            width: 1.0,
            points: Vec::new(),
        };
        Operation::stamp(draft, 1, origin)
    }

    #[test]
    fn permit_all_allows_any_actor() {
        let op = op_from("c_a");
        assert!(PermitAll.permits("c_b", &op, Transition::Undo));
        assert!(PermitAll.permits("c_b", &op, Transition::Redo));
    }

    #[test]
    fn origin_only_restricts_to_submitter() {
        let op = op_from("c_a");
        assert!(OriginOnly.permits("c_a", &op, Transition::Undo));
        assert!(!OriginOnly.permits("c_b", &op, Transition::Undo));
        assert!(!OriginOnly.permits("c_b", &op, Transition::Redo));
    }

    #[test]
    fn kind_parse_accepts_known_values() {
        assert_eq!(UndoPolicyKind::parse("permit_all"), Some(UndoPolicyKind::PermitAll));
        assert_eq!(UndoPolicyKind::parse(" Origin_Only "), Some(UndoPolicyKind::OriginOnly));
        assert_eq!(UndoPolicyKind::parse("owner"), None);
    }

    #[test]
    fn built_policy_matches_kind() {
        let op = op_from("c_a");
        assert!(UndoPolicyKind::PermitAll.build().permits("c_z", &op, Transition::Undo));
        assert!(!UndoPolicyKind::OriginOnly.build().permits("c_z", &op, Transition::Undo));
    }
}
