use super::*;
use crate::state::test_helpers::{draft, test_app_state};
use tokio::sync::mpsc;

#[tokio::test]
async fn list_rooms_is_empty_before_any_join() {
    let state = test_app_state();
    let Json(rooms) = list_rooms(State(state)).await;
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn list_rooms_reports_members_and_sequence() {
    let state = test_app_state();
    let (tx, _rx) = mpsc::channel(64);
    let handle = directory::join(&state, "sketch", "c_a", tx).await;
    room::lock(&handle).submit_op(draft("u1"), "c_a").expect("append");

    let Json(rooms) = list_rooms(State(state)).await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "sketch");
    assert_eq!(rooms[0].members, 1);
    assert_eq!(rooms[0].last_seq, 1);
}

#[tokio::test]
async fn missing_room_is_not_found() {
    let state = test_app_state();
    let users = list_users(State(state.clone()), Path("ghost".into())).await;
    assert_eq!(users.err(), Some(StatusCode::NOT_FOUND));
    let snap = snapshot(State(state.clone()), Path("ghost".into())).await;
    assert_eq!(snap.err(), Some(StatusCode::NOT_FOUND));
    let cp = checkpoint(State(state), Path("ghost".into())).await;
    assert_eq!(cp.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn users_and_snapshot_reflect_room_state() {
    let state = test_app_state();
    let (tx, _rx) = mpsc::channel(64);
    let handle = directory::join(&state, "sketch", "c_a", tx).await;
    {
        let mut room = room::lock(&handle);
        room.submit_op(draft("u1"), "c_a").expect("append u1");
        room.submit_op(draft("u2"), "c_a").expect("append u2");
        room.request_undo("u1", "c_a", state.policy.as_ref()).expect("undo u1");
    }

    let Json(users) = list_users(State(state.clone()), Path("sketch".into())).await.expect("room exists");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "c_a");

    let Json(snap) = snapshot(State(state), Path("sketch".into())).await.expect("room exists");
    let ids: Vec<&str> = snap.ops.iter().map(|op| op.op_id.as_str()).collect();
    assert_eq!(ids, vec!["u2"]);
}

#[tokio::test]
async fn checkpoint_appears_after_interval() {
    let state = test_app_state();
    let (tx, _rx) = mpsc::channel(1);
    let handle = directory::join(&state, "sketch", "c_a", tx).await;

    assert_eq!(
        checkpoint(State(state.clone()), Path("sketch".into())).await.err(),
        Some(StatusCode::NOT_FOUND)
    );

    {
        let mut room = room::lock(&handle);
        for i in 0..crate::services::catchup::CHECKPOINT_EVERY {
            room.submit_op(draft(&format!("u{i}")), "c_a").expect("append");
        }
    }

    let Json(cp) = checkpoint(State(state), Path("sketch".into())).await.expect("checkpoint exists");
    assert_eq!(cp.seq, crate::services::catchup::CHECKPOINT_EVERY);
    assert_eq!(cp.snapshot.ops.len(), 200);
}
