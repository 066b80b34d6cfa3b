//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the websocket gateway and a small read-only inspection
//! API under a single Axum router. The drawing client is served as static
//! files from the configured directory for every other path.

pub mod rooms;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router: websocket, API routes, and static client.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/rooms", get(rooms::list_rooms))
        .route("/api/rooms/{name}/users", get(rooms::list_users))
        .route("/api/rooms/{name}/snapshot", get(rooms::snapshot))
        .route("/api/rooms/{name}/checkpoint", get(rooms::checkpoint))
        .route("/healthz", get(healthz))
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
