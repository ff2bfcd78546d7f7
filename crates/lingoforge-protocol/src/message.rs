//! Client and server envelopes.
//!
//! Every message on the wire is `{ "type": <snake_case>, "payload": {...} }`
//! with camelCase payload fields. Unit messages (`ping`, `pong`) may omit
//! the payload.

use serde::{Deserialize, Serialize};

use crate::{
    Deck, ErrorCode, GameEvent, GameMode, GameSession, GameSettings, HostKey, PlayerAction,
    PlayerId, RoomCode,
};

/// Messages a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Host a new room. Answered with `session_joined` carrying the host key.
    CreateSession {
        mode: GameMode,
        #[serde(default)]
        settings: GameSettings,
        deck: Deck,
        host_name: String,
        user_id: Option<String>,
    },
    /// Join a room, or rebind to an existing player via `host_key` /
    /// `player_id` / `user_id`.
    JoinSession {
        code: RoomCode,
        name: String,
        user_id: Option<String>,
        host_key: Option<HostKey>,
        player_id: Option<PlayerId>,
    },
    StartGame {
        code: RoomCode,
        player_id: PlayerId,
    },
    PauseGame {
        code: RoomCode,
        player_id: PlayerId,
    },
    ResumeGame {
        code: RoomCode,
        player_id: PlayerId,
    },
    EndGame {
        code: RoomCode,
        player_id: PlayerId,
    },
    SubmitAction {
        code: RoomCode,
        player_id: PlayerId,
        action: PlayerAction,
    },
    Clap {
        code: RoomCode,
        player_id: PlayerId,
        target_id: PlayerId,
    },
    LeaveSession {
        code: RoomCode,
        player_id: PlayerId,
    },
    ExportStandings {
        code: RoomCode,
    },
    Ping,
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Sent only to the joining connection.
    SessionJoined {
        code: RoomCode,
        player_id: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host_key: Option<HostKey>,
        session: GameSession,
    },
    /// Broadcast after every settled mutation.
    SessionState(GameSession),
    GameEvent {
        event: GameEvent,
    },
    Standings {
        code: RoomCode,
        csv: String,
    },
    Pong,
    Error {
        message: String,
        code: ErrorCode,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            code,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
