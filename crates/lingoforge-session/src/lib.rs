//! Connection-level bookkeeping for Lingoforge.
//!
//! A *player* lives inside a room and survives disconnects. A *connection*
//! is one socket. This crate keeps the two apart:
//!
//! 1. **Registry**: which connection currently speaks for which
//!    `(room, player)` pair, and fan-out to everyone in a room
//!    ([`ConnectionRegistry`]).
//! 2. **Identity**: generating player ids, host keys, and room codes.
//!
//! ```text
//! Room Layer (above)  ← fans out snapshots through the registry
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, RoomCode, ConnectionId
//! ```

mod error;
mod identity;
mod registry;

pub use error::SessionError;
pub use identity::{generate_host_key, generate_player_id, generate_room_code};
pub use registry::{Binding, ConnectionRegistry, Outbound};
