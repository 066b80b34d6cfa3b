mod config;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");
    let port = config.port;
    tracing::info!(
        %port,
        default_room = %config.default_room,
        static_dir = %config.static_dir.display(),
        undo_policy = ?config.undo_policy,
        "configuration loaded"
    );

    let state = state::AppState::new(config);

    // Spawn background idle-room reclamation.
    let _reaper = services::reaper::spawn_reaper_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "inkroom listening");
    axum::serve(listener, app).await.expect("server failed");
}
