use super::*;
use serde_json::json;

fn sample_draft() -> OpDraft {
    OpDraft {
        op_id: "u1".to_owned(),
        user_id: "local".to_owned(),
        tool: Tool::Pen,
        color: "#000000".to_owned(),
        width: 2.0,
        points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)],
    }
}

#[test]
fn stamp_assigns_seq_and_origin_and_starts_active() {
    let op = Operation::stamp(sample_draft(), 1, "A");
    assert_eq!(op.seq, 1);
    assert_eq!(op.origin, "A");
    assert!(!op.tombstone);
    assert_eq!(op.points.len(), 2);
}

#[test]
fn operation_serializes_with_camel_case_wire_keys() {
    let op = Operation::stamp(sample_draft(), 7, "c_abc1234");
    let value = serde_json::to_value(&op).expect("serialize");
    assert_eq!(value["opId"], "u1");
    assert_eq!(value["userId"], "local");
    assert_eq!(value["tool"], "pen");
    assert_eq!(value["seq"], 7);
    assert_eq!(value["origin"], "c_abc1234");
    assert_eq!(value["tombstone"], false);
    assert_eq!(value["points"][1]["x"], 5.0);
}

#[test]
fn decode_client_op_from_browser_shape() {
    let text = json!({
        "type": "client_op",
        "op": {
            "opId": "u1",
            "userId": "local",
            "tool": "brush",
            "color": "#ff0000",
            "width": 4,
            "points": [{"x": 0, "y": 0}, {"x": 5, "y": 5}]
        }
    })
    .to_string();

    let msg = decode_client(&text).expect("client_op should decode");
    let ClientMessage::ClientOp { op } = msg else {
        panic!("expected client_op");
    };
    assert_eq!(op.op_id, "u1");
    assert_eq!(op.tool, Tool::Brush);
    assert!((op.width - 4.0).abs() < f64::EPSILON);
}

#[test]
fn decode_undo_and_redo_read_op_id_key() {
    let undo = decode_client(r#"{"type":"undo","opId":"u1"}"#).expect("undo");
    assert_eq!(undo, ClientMessage::Undo { op_id: "u1".into() });
    let redo = decode_client(r#"{"type":"redo","opId":"u2"}"#).expect("redo");
    assert_eq!(redo, ClientMessage::Redo { op_id: "u2".into() });
}

#[test]
fn decode_client_rejects_non_json() {
    let err = decode_client("not json").expect_err("should fail");
    assert!(matches!(err, DecodeError::Json(_)));
}

#[test]
fn decode_client_rejects_missing_type() {
    let err = decode_client(r#"{"opId":"u1"}"#).expect_err("should fail");
    assert!(matches!(err, DecodeError::MissingType));
}

#[test]
fn decode_client_reports_unknown_type() {
    let err = decode_client(r#"{"type":"teleport"}"#).expect_err("should fail");
    assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "teleport"));
}

#[test]
fn decode_client_reports_malformed_known_type() {
    let err = decode_client(r#"{"type":"cursor","x":"left"}"#).expect_err("should fail");
    assert!(matches!(err, DecodeError::Malformed { ref kind, .. } if kind == "cursor"));
}

#[test]
fn decode_client_rejects_unknown_tool() {
    let text = r##"{"type":"client_op","op":{"opId":"u1","userId":"u","tool":"spray","color":"#000","width":1,"points":[]}}"##;
    let err = decode_client(text).expect_err("should fail");
    assert!(matches!(err, DecodeError::Malformed { .. }));
}

#[test]
fn decode_client_rejects_empty_op_id() {
    let text = r##"{"type":"client_op","op":{"opId":"","userId":"u","tool":"pen","color":"#000","width":1,"points":[]}}"##;
    let err = decode_client(text).expect_err("should fail");
    assert!(matches!(err, DecodeError::EmptyOpId));
}

#[test]
fn server_messages_carry_snake_case_type_tags() {
    let welcome = ServerMessage::Welcome {
        client_id: "c_1".into(),
        snapshot: Snapshot::default(),
        ops: Vec::new(),
    };
    let value = serde_json::to_value(&welcome).expect("serialize");
    assert_eq!(value["type"], "welcome");
    assert_eq!(value["clientId"], "c_1");
    assert!(value["snapshot"]["ops"].as_array().expect("ops array").is_empty());

    let undo = ServerMessage::UndoBroadcast { op_id: "u1".into() };
    let value = serde_json::to_value(&undo).expect("serialize");
    assert_eq!(value, json!({"type": "undo_broadcast", "opId": "u1"}));
    assert_eq!(undo.kind(), "undo_broadcast");
}

#[test]
fn decode_server_reads_encoded_op_broadcast() {
    let msg = ServerMessage::OpBroadcast { op: Operation::stamp(sample_draft(), 3, "A") };
    let text = encode(&msg).expect("encode");
    let decoded = decode_server(&text).expect("decode");
    assert_eq!(decoded, msg);
}

#[test]
fn decode_server_ignores_client_only_types() {
    let err = decode_server(r#"{"type":"client_op","op":{}}"#).expect_err("should fail");
    assert!(matches!(err, DecodeError::UnknownType(_)));
}

#[test]
fn same_content_ignores_tombstone_and_seq() {
    let a = Operation::stamp(sample_draft(), 1, "A");
    let mut b = a.clone();
    b.tombstone = true;
    b.seq = 9;
    assert!(a.same_content(&b));
    b.color = "#ffffff".into();
    assert!(!a.same_content(&b));
}
