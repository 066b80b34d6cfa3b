//! Read-only room inspection routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use strokes::{Snapshot, User};

use crate::services::directory;
use crate::services::room::{self, Checkpoint, RoomSummary};
use crate::state::AppState;

/// `GET /api/rooms` — summary of every live room.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(directory::list(&state).await)
}

/// `GET /api/rooms/{name}/users` — current presence list.
pub async fn list_users(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Vec<User>>, StatusCode> {
    let room = directory::get(&state, &name).await.ok_or(StatusCode::NOT_FOUND)?;
    let users = room::lock(&room).users();
    Ok(Json(users))
}

/// `GET /api/rooms/{name}/snapshot` — active operations as of now.
pub async fn snapshot(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Snapshot>, StatusCode> {
    let room = directory::get(&state, &name).await.ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = room::lock(&room).snapshot();
    Ok(Json(snapshot))
}

/// `GET /api/rooms/{name}/checkpoint` — the latest periodic snapshot.
pub async fn checkpoint(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Checkpoint>, StatusCode> {
    let room = directory::get(&state, &name).await.ok_or(StatusCode::NOT_FOUND)?;
    let checkpoint = room::lock(&room).checkpoint().cloned();
    checkpoint.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
