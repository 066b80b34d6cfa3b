//! Client identity registry.
//!
//! Identities are short random tokens (`c_` + 7 base-36 characters). They are
//! unique among currently connected clients only; a reconnecting client gets
//! a fresh identity and never resumes an old one.

use rand::Rng;

use crate::state::AppState;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 7;

/// Generate a candidate identity. Not checked for uniqueness.
#[must_use]
pub fn generate_client_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("c_{suffix}")
}

/// Allocate an identity not held by any connected client and record the
/// room it is joining.
pub async fn register(state: &AppState, room: &str) -> String {
    let mut clients = state.clients.write().await;
    loop {
        let id = generate_client_id();
        if !clients.contains_key(&id) {
            clients.insert(id.clone(), room.to_owned());
            return id;
        }
    }
}

/// Free an identity on disconnect. Returns the room it was in.
pub async fn release(state: &AppState, client_id: &str) -> Option<String> {
    state.clients.write().await.remove(client_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_helpers;
    use std::collections::HashSet;

    #[test]
    fn generated_id_has_expected_shape() {
        let id = generate_client_id();
        assert!(id.starts_with("c_"));
        assert_eq!(id.len(), 2 + ID_LEN);
        assert!(id[2..].bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn registered_ids_are_unique_among_connected_clients() {
        let state = test_helpers::test_app_state();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let id = register(&state, "default").await;
            assert!(seen.insert(id), "identity reused while still connected");
        }
        assert_eq!(state.clients.read().await.len(), 500);
    }

    #[tokio::test]
    async fn release_frees_identity_and_reports_room() {
        let state = test_helpers::test_app_state();
        let id = register(&state, "lobby").await;
        assert_eq!(state.clients.read().await.get(&id).map(String::as_str), Some("lobby"));

        assert_eq!(release(&state, &id).await.as_deref(), Some("lobby"));
        assert!(!state.clients.read().await.contains_key(&id));
        assert!(release(&state, &id).await.is_none());
    }
}
