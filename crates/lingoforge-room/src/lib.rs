//! Room lifecycle for Lingoforge.
//!
//! Each active game runs as an isolated Tokio task (actor model) that owns
//! its [`GameSession`](lingoforge_protocol::GameSession) outright. Every
//! command for a room, including timer expiries, goes through that task's
//! mailbox one at a time, so no lock is ever taken on game state.
//!
//! # Key types
//!
//! - [`SessionStore`]: creates rooms under unique codes, looks them up,
//!   forgets them on eviction
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: mailbox size, eviction timeouts, mode rules
//! - [`GameError`]: everything a command can be rejected with

mod config;
mod coordinator;
mod error;
mod room;
mod store;

pub use config::RoomConfig;
pub use error::GameError;
pub use room::{Control, JoinRequest, Joined, RoomHandle};
pub use store::{Created, NewSession, SessionStore};
