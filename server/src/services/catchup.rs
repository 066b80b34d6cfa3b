//! Snapshot and catch-up builder for clients joining mid-session.
//!
//! DESIGN
//! ======
//! A joiner receives the most recent active operations (bounded, so the
//! welcome stays small for long sessions) plus the raw tail of the log. The
//! raw tail includes tombstoned entries so undo/redo flips that just happened
//! are layered over the snapshot by opId on the client.

use strokes::{Operation, ServerMessage, Snapshot};

use crate::services::oplog::OperationLog;

/// Maximum active operations carried by a snapshot.
pub const SNAPSHOT_LIMIT: usize = 1000;

/// Raw log entries appended to the welcome payload.
pub const RECENT_RAW: usize = 50;

/// A checkpoint snapshot is rebuilt every this many sequence numbers.
pub const CHECKPOINT_EVERY: u64 = 200;

/// Most recent `limit` non-tombstoned entries, in sequence order.
#[must_use]
pub fn build_snapshot(log: &OperationLog, limit: usize) -> Snapshot {
    if log.is_empty() {
        return Snapshot::default();
    }
    let mut ops: Vec<Operation> = log
        .entries()
        .iter()
        .rev()
        .filter(|op| !op.tombstone)
        .take(limit)
        .cloned()
        .collect();
    ops.reverse();
    Snapshot { ops }
}

/// Last `n` raw entries regardless of tombstone state.
#[must_use]
pub fn recent_raw(log: &OperationLog, n: usize) -> Vec<Operation> {
    let entries = log.entries();
    entries[entries.len().saturating_sub(n)..].to_vec()
}

/// Compose the join handshake for `client_id`.
#[must_use]
pub fn welcome(client_id: &str, log: &OperationLog) -> ServerMessage {
    ServerMessage::Welcome {
        client_id: client_id.to_owned(),
        snapshot: build_snapshot(log, SNAPSHOT_LIMIT),
        ops: recent_raw(log, RECENT_RAW),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_helpers::draft;

    fn log_with(count: usize) -> OperationLog {
        let mut log = OperationLog::new();
        for i in 0..count {
            log.append(draft(&format!("op-{i}")), "c_a").expect("append");
        }
        log
    }

    #[test]
    fn snapshot_of_empty_log_is_empty() {
        let log = OperationLog::new();
        assert!(build_snapshot(&log, SNAPSHOT_LIMIT).ops.is_empty());
        assert!(recent_raw(&log, RECENT_RAW).is_empty());
    }

    #[test]
    fn snapshot_excludes_tombstoned_entries() {
        let mut log = log_with(5);
        log.set_tombstone("op-1", true);
        log.set_tombstone("op-3", true);

        let snap = build_snapshot(&log, SNAPSHOT_LIMIT);
        let ids: Vec<&str> = snap.ops.iter().map(|op| op.op_id.as_str()).collect();
        assert_eq!(ids, vec!["op-0", "op-2", "op-4"]);
        assert!(snap.ops.iter().all(|op| !op.tombstone));
    }

    #[test]
    fn snapshot_keeps_most_recent_active_entries_in_order() {
        let mut log = log_with(1200);
        log.set_tombstone("op-1199", true);

        let snap = build_snapshot(&log, SNAPSHOT_LIMIT);
        assert_eq!(snap.ops.len(), SNAPSHOT_LIMIT);
        assert_eq!(snap.ops.first().expect("first").seq, 200);
        assert_eq!(snap.ops.last().expect("last").seq, 1199);
        assert!(snap.ops.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn recent_raw_includes_tombstoned_entries() {
        let mut log = log_with(60);
        log.set_tombstone("op-59", true);

        let raw = recent_raw(&log, RECENT_RAW);
        assert_eq!(raw.len(), RECENT_RAW);
        assert_eq!(raw.first().expect("first").seq, 11);
        assert!(raw.last().expect("last").tombstone);
    }

    #[test]
    fn recent_raw_shorter_than_n_returns_everything() {
        let log = log_with(3);
        assert_eq!(recent_raw(&log, RECENT_RAW).len(), 3);
    }

    #[test]
    fn welcome_after_250_submissions_carries_snapshot_and_tail() {
        let log = log_with(250);
        let ServerMessage::Welcome { client_id, snapshot, ops } = welcome("c_new", &log) else {
            panic!("expected welcome");
        };
        assert_eq!(client_id, "c_new");
        assert_eq!(snapshot.ops.len(), 250);
        assert_eq!(ops.len(), RECENT_RAW);
        assert_eq!(ops.last().expect("tail").seq, 250);
    }
}
