//! Room directory — lazily creates rooms by name and routes membership.
//!
//! DESIGN
//! ======
//! Rooms are created on first reference and stay in memory while anyone is
//! connected. Joins take the directory write lock so the idle-room reaper
//! (which also needs it) can never remove a room between lookup and join.
//! Per-room work only takes the directory read lock plus that room's mutex.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::info;

use crate::services::room::{self, Room, RoomSummary};
use crate::state::{AppState, ClientTx};

/// Return the named room, creating and registering it if absent.
#[cfg(test)]
pub(crate) async fn get_or_create(state: &AppState, name: &str) -> Arc<Mutex<Room>> {
    if let Some(room) = get(state, name).await {
        return room;
    }
    let mut rooms = state.rooms.write().await;
    Arc::clone(rooms.entry(name.to_owned()).or_insert_with(|| new_room(name)))
}

/// Return the named room if it exists.
pub async fn get(state: &AppState, name: &str) -> Option<Arc<Mutex<Room>>> {
    state.rooms.read().await.get(name).cloned()
}

/// Join `client_id` to the named room, creating the room if needed.
/// The joiner receives its welcome through `tx` before any other message.
pub async fn join(state: &AppState, name: &str, client_id: &str, tx: ClientTx) -> Arc<Mutex<Room>> {
    let mut rooms = state.rooms.write().await;
    let entry = rooms.entry(name.to_owned()).or_insert_with(|| new_room(name));
    room::lock(entry).join(client_id, tx);
    Arc::clone(entry)
}

/// Remove `client_id` from the named room. Missing rooms are ignored.
pub async fn leave(state: &AppState, name: &str, client_id: &str) {
    if let Some(room) = get(state, name).await {
        room::lock(&room).leave(client_id);
    }
}

/// Summaries of every live room, ordered by name.
pub async fn list(state: &AppState) -> Vec<RoomSummary> {
    let rooms = state.rooms.read().await;
    let mut out: Vec<RoomSummary> = rooms.values().map(|room| room::lock(room).summary()).collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Drop rooms that have been empty for at least `grace`. Returns their names.
pub async fn reap_idle(state: &AppState, grace: Duration, now: Instant) -> Vec<String> {
    let mut rooms = state.rooms.write().await;
    let idle: Vec<String> = rooms
        .iter()
        .filter(|(_, room)| room::lock(room).idle_for(grace, now))
        .map(|(name, _)| name.clone())
        .collect();
    for name in &idle {
        rooms.remove(name);
        info!(room = %name, "reclaimed idle room");
    }
    idle
}

fn new_room(name: &str) -> Arc<Mutex<Room>> {
    info!(room = %name, "room created");
    Arc::new(Mutex::new(Room::new(name)))
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
