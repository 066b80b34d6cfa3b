//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room directory, the registry of connected client identities,
//! the undo authorization policy, and the parsed configuration. Each room sits
//! behind its own mutex so distinct rooms never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, mpsc};

use crate::config::ServerConfig;
use crate::services::policy::UndoPolicy;
use crate::services::room::Room;

/// Outbound channel for one connection. Frames are pre-serialized JSON text
/// shared across all recipients of a broadcast.
pub type ClientTx = mpsc::Sender<Arc<str>>;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Live rooms keyed by name.
    pub rooms: Arc<RwLock<HashMap<String, Arc<Mutex<Room>>>>>,
    /// Connected clients: `client_id` -> name of the room it joined.
    pub clients: Arc<RwLock<HashMap<String, String>>>,
    pub policy: Arc<dyn UndoPolicy>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let policy = config.undo_policy.build();
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            clients: Arc::new(RwLock::new(HashMap::new())),
            policy,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::policy::UndoPolicyKind;

    #[tokio::test]
    async fn new_state_has_no_rooms_or_clients() {
        let state = test_helpers::test_app_state();
        assert!(state.rooms.read().await.is_empty());
        assert!(state.clients.read().await.is_empty());
    }

    #[test]
    fn policy_follows_config() {
        let config = ServerConfig { undo_policy: UndoPolicyKind::OriginOnly, ..ServerConfig::default() };
        let state = AppState::new(config);
        let op = strokes::Operation::stamp(test_helpers::draft("u1"), 1, "c_a");
        assert!(!state.policy.permits("c_b", &op, crate::services::policy::Transition::Undo));
        assert!(state.policy.permits("c_a", &op, crate::services::policy::Transition::Undo));
    }
}
