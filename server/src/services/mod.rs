//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the room model, sequencing, and fanout so route
//! handlers can stay focused on protocol translation.

pub mod catchup;
pub mod clients;
pub mod directory;
pub mod fanout;
pub mod oplog;
pub mod policy;
pub mod reaper;
pub mod room;
