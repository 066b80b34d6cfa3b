//! Server configuration parsed from environment variables.
//!
//! Optional tuning knobs fall back to defaults when unset or unparsable.
//! `PORT` and `UNDO_POLICY` are strict: a bad value is a startup error.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::policy::UndoPolicyKind;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ROOM: &str = "default";
pub const DEFAULT_STATIC_DIR: &str = "client";
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_ROOM_IDLE_GRACE_SECS: u64 = 300;
pub const DEFAULT_ROOM_REAP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    #[error("unknown UNDO_POLICY: {0} (expected permit_all or origin_only)")]
    UnknownUndoPolicy(String),
    #[error("CLIENT_QUEUE_CAPACITY must be greater than zero")]
    ZeroQueueCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Room every connection joins when it does not name one.
    pub default_room: String,
    /// Directory served as the static drawing client.
    pub static_dir: PathBuf,
    /// Outbound frames buffered per connection before sends are dropped.
    pub client_queue_capacity: usize,
    /// How long an empty room is kept before it is reclaimed.
    pub room_idle_grace: Duration,
    pub room_reap_interval: Duration,
    pub undo_policy: UndoPolicyKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_room: DEFAULT_ROOM.to_owned(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            room_idle_grace: Duration::from_secs(DEFAULT_ROOM_IDLE_GRACE_SECS),
            room_reap_interval: Duration::from_secs(DEFAULT_ROOM_REAP_INTERVAL_SECS),
            undo_policy: UndoPolicyKind::PermitAll,
        }
    }
}

impl ServerConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DEFAULT_ROOM`: default `default`
    /// - `STATIC_DIR`: default `client`
    /// - `CLIENT_QUEUE_CAPACITY`: default 256
    /// - `ROOM_IDLE_GRACE_SECS`: default 300
    /// - `ROOM_REAP_INTERVAL_SECS`: default 30
    /// - `UNDO_POLICY`: `permit_all` (default) or `origin_only`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unparsable `PORT`, an unknown
    /// `UNDO_POLICY`, or a zero queue capacity.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let undo_policy = match lookup("UNDO_POLICY") {
            Some(raw) => UndoPolicyKind::parse(&raw).ok_or(ConfigError::UnknownUndoPolicy(raw))?,
            None => UndoPolicyKind::PermitAll,
        };

        let client_queue_capacity = parse_or(&lookup, "CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY);
        if client_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        let default_room = lookup("DEFAULT_ROOM")
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOM.to_owned());

        Ok(Self {
            port,
            default_room,
            static_dir: lookup("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
            client_queue_capacity,
            room_idle_grace: Duration::from_secs(parse_or(&lookup, "ROOM_IDLE_GRACE_SECS", DEFAULT_ROOM_IDLE_GRACE_SECS)),
            room_reap_interval: Duration::from_secs(
                parse_or(&lookup, "ROOM_REAP_INTERVAL_SECS", DEFAULT_ROOM_REAP_INTERVAL_SECS).max(1),
            ),
            undo_policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
