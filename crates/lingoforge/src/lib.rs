//! # Lingoforge
//!
//! Realtime multiplayer study games for the classroom.
//!
//! A host creates a room from a vocabulary deck, students join with the
//! room code, and the server runs one of three modes (Word Heist,
//! Lightning Ladder, Survival Sprint) authoritatively. Clients speak JSON
//! envelopes over WebSocket and receive a fresh session snapshot after
//! every settled change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lingoforge::prelude::*;
//!
//! # async fn run() -> Result<(), LingoforgeError> {
//! lingoforge::telemetry::init_tracing();
//! let server = LingoforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
pub mod telemetry;

pub use error::LingoforgeError;
pub use server::{LingoforgeServer, LingoforgeServerBuilder, ServerConfig};

pub mod prelude {
    pub use crate::{LingoforgeError, LingoforgeServer, LingoforgeServerBuilder, ServerConfig};
    pub use lingoforge_modes::{HeistRules, LadderRules, ModeRules, SprintRules};
    pub use lingoforge_protocol::{
        Card, ClientMessage, Deck, Direction, ErrorCode, GameEvent, GameMode, GameSession,
        GameSettings, GameStatus, HostKey, PlayerAction, PlayerId, RoomCode, ServerMessage,
    };
    pub use lingoforge_room::{RoomConfig, SessionStore};
}
