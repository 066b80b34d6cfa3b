//! Reaper — background reclamation of idle rooms.
//!
//! DESIGN
//! ======
//! Rooms are created on demand. Without reclamation every room name ever
//! used would stay in memory for the life of the process. The reaper wakes
//! on a fixed interval and drops rooms that have had no members for the
//! configured grace period. Room state is in-memory only, so a reclaimed
//! room's log is discarded.

use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::services::directory;
use crate::state::AppState;

/// Spawn the background reaper task. Returns a handle for shutdown.
pub fn spawn_reaper_task(state: AppState) -> JoinHandle<()> {
    let interval = state.config.room_reap_interval;
    let grace = state.config.room_idle_grace;
    info!(interval_secs = interval.as_secs(), grace_secs = grace.as_secs(), "idle room reaper configured");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let reaped = directory::reap_idle(&state, grace, Instant::now()).await;
            if !reaped.is_empty() {
                debug!(count = reaped.len(), "reaper pass complete");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn reaper_task_reclaims_empty_room() {
        let config = ServerConfig {
            room_idle_grace: Duration::ZERO,
            room_reap_interval: Duration::from_millis(10),
            ..ServerConfig::default()
        };
        let state = AppState::new(config);
        directory::get_or_create(&state, "scratch").await;

        let handle = spawn_reaper_task(state.clone());
        tokio::time::timeout(Duration::from_secs(2), async {
            while directory::get(&state, "scratch").await.is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("idle room should be reclaimed");
        handle.abort();
    }
}
