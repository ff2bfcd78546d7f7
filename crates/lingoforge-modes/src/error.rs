//! Error types for mode engines.

use lingoforge_protocol::{GameMode, PlayerId};

/// Why an engine refused an action. The session is left untouched whenever
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("player {0} is not in this session")]
    UnknownPlayer(PlayerId),

    #[error("answer is for card {got}, but the current card is {expected}")]
    WrongCard { expected: String, got: String },

    #[error("choose bank, risk, or steal before answering again")]
    DecisionPending,

    #[error("there is no decision to make right now")]
    NoDecisionPending,

    #[error("{action} is not available in {mode}")]
    Unsupported { mode: GameMode, action: &'static str },

    #[error("invalid steal target: {0}")]
    InvalidTarget(String),

    #[error("eliminated players cannot answer")]
    Eliminated,

    #[error("already answered this round")]
    AlreadyAnswered,

    #[error("no round is in progress")]
    NoActiveRound,

    #[error("the deck has no cards")]
    EmptyDeck,
}
