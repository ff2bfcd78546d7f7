//! Player actions and point-in-time game events.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// What a player does during play, carried by `submit_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum PlayerAction {
    /// Answer the card the player is currently on.
    Answer { card_id: String, response: String },
    /// Word Heist: secure every unbanked key.
    Bank,
    /// Word Heist: leave keys at risk and move on.
    Risk,
    /// Word Heist: try to take a key from another player.
    Steal { target_id: PlayerId },
}

/// Result of a steal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealOutcome {
    Success,
    Failed,
    /// The target's shield absorbed it.
    Blocked,
    /// The target had no unbanked keys.
    NothingToSteal,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Host,
    DurationCap,
    WinCondition,
}

/// One player's line in a resolved Survival Sprint round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub player_id: PlayerId,
    pub answered: bool,
    pub correct: bool,
    pub bonus: u32,
    pub hearts: u32,
}

/// Something that happened, as opposed to the state it left behind.
///
/// Events ride in `game_event` messages after the `session_state` that
/// reflects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum GameEvent {
    GameStarted,
    GamePaused {
        /// Paused because nobody was left connected.
        automatic: bool,
    },
    GameResumed,
    GameEnded {
        winner_id: Option<PlayerId>,
        reason: EndReason,
    },
    HostChanged {
        host_id: PlayerId,
    },
    AnswerGraded {
        player_id: PlayerId,
        card_id: String,
        correct: bool,
        expected: Option<String>,
    },
    KeyEarned {
        player_id: PlayerId,
        unbanked: u32,
    },
    KeysDropped {
        player_id: PlayerId,
        lost: u32,
    },
    Banked {
        player_id: PlayerId,
        amount: u32,
        total: u32,
        shielded: bool,
    },
    RiskTaken {
        player_id: PlayerId,
        at_risk: u32,
    },
    StealResolved {
        thief_id: PlayerId,
        target_id: PlayerId,
        outcome: StealOutcome,
    },
    LadderMoved {
        player_id: PlayerId,
        from: u32,
        to: u32,
    },
    RoundResolved {
        round: u32,
        results: Vec<RoundResult>,
    },
    PlayerEliminated {
        player_id: PlayerId,
    },
    Clap {
        from_id: PlayerId,
        target_id: PlayerId,
        total: u32,
    },
}
