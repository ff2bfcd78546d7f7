//! Error types for the room layer.

use lingoforge_modes::ModeError;
use lingoforge_protocol::{ErrorCode, RoomCode};
use lingoforge_session::SessionError;

/// Why a room command was rejected. A rejected command never changes the
/// session and is reported only to the connection that sent it.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("only the host can do that")]
    NotHost,

    #[error("not allowed right now: {0}")]
    InvalidState(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("game in room {0} has already ended")]
    GameAlreadyEnded(RoomCode),

    /// Bad input: blank names, empty decks, out-of-range settings.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The room's actor stopped between lookup and delivery.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl GameError {
    /// The wire code clients switch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::RoomNotFound(_) | GameError::Unavailable(_) => ErrorCode::RoomNotFound,
            GameError::RoomFull(_) => ErrorCode::RoomFull,
            GameError::NotHost => ErrorCode::NotHost,
            GameError::InvalidState(_) => ErrorCode::InvalidState,
            GameError::InvalidAction(_) => ErrorCode::InvalidAction,
            GameError::GameAlreadyEnded(_) => ErrorCode::GameAlreadyEnded,
            GameError::InvalidRequest(_) | GameError::Session(_) => ErrorCode::InvalidRequest,
        }
    }
}

impl From<ModeError> for GameError {
    fn from(err: ModeError) -> Self {
        GameError::InvalidAction(err.to_string())
    }
}
