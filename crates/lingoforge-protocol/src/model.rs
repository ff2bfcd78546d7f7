//! The authoritative session snapshot.
//!
//! A [`GameSession`] is mutated only by its room's coordinator and
//! serialized as-is (after per-viewer redaction) into every
//! `session_state` broadcast. All timestamps are Unix milliseconds.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Card, Deck, Direction, PlayerId, RoomCode};

// ---------------------------------------------------------------------------
// Mode and status
// ---------------------------------------------------------------------------

/// The scoring variant a session plays. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    WordHeist,
    LightningLadder,
    SurvivalSprint,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameMode::WordHeist => "word_heist",
            GameMode::LightningLadder => "lightning_ladder",
            GameMode::SurvivalSprint => "survival_sprint",
        })
    }
}

/// Lifecycle of a session.
///
/// ```text
/// Lobby ──→ Playing ⇄ Paused
///              │         │
///              └──→ Ended ←┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Playing,
    Paused,
    Ended,
}

impl GameStatus {
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Lobby, GameStatus::Playing)
                | (GameStatus::Playing, GameStatus::Paused)
                | (GameStatus::Paused, GameStatus::Playing)
                | (GameStatus::Playing, GameStatus::Ended)
                | (GameStatus::Paused, GameStatus::Ended)
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameStatus::Lobby => "lobby",
            GameStatus::Playing => "playing",
            GameStatus::Paused => "paused",
            GameStatus::Ended => "ended",
        })
    }
}

/// Colour of a narrated outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTone {
    Positive,
    Negative,
    Neutral,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Host-chosen options. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub direction: Direction,
    /// Answer window per card (Lightning Ladder speed) or per round
    /// (Survival Sprint deadline).
    pub seconds_per_question: u32,
    pub max_players: Option<u32>,
    /// Automatic end after this much play time. Paused time doesn't count.
    pub duration_cap_secs: Option<u32>,
    /// Only players with a linked account may join.
    pub classroom_only: bool,
    /// Whether new players may join after the lobby.
    pub allow_late_join: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            seconds_per_question: 10,
            max_players: None,
            duration_cap_secs: None,
            classroom_only: false,
            allow_late_join: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// One participant. Created on first join, never removed; disconnecting
/// only clears `connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub user_id: Option<String>,
    pub joined_at: u64,
    pub connected: bool,

    pub correct: u32,
    pub incorrect: u32,

    // Word Heist
    pub banked_keys: u32,
    pub unbanked_keys: u32,
    pub shielded: bool,

    // Lightning Ladder
    pub ladder_position: u32,
    pub ladder_peak: u32,

    // Survival Sprint
    pub hearts: u32,
    pub score: u32,
    pub eliminated: bool,

    /// Position in the card sequence. Never decreases while playing.
    pub current_index: u32,
    pub card_started_at: Option<u64>,
    pub pending_decision: bool,

    /// Most recent narrated outcome. Only the player it belongs to sees it.
    pub last_event: Option<String>,
    pub last_event_tone: Option<EventTone>,

    pub claps: u32,
}

impl GamePlayer {
    pub fn new(id: PlayerId, name: impl Into<String>, user_id: Option<String>, now: u64) -> Self {
        Self {
            id,
            name: name.into(),
            user_id,
            joined_at: now,
            connected: false,
            correct: 0,
            incorrect: 0,
            banked_keys: 0,
            unbanked_keys: 0,
            shielded: false,
            ladder_position: 0,
            ladder_peak: 0,
            hearts: 0,
            score: 0,
            eliminated: false,
            current_index: 0,
            card_started_at: None,
            pending_decision: false,
            last_event: None,
            last_event_tone: None,
            claps: 0,
        }
    }

    pub fn narrate(&mut self, text: impl Into<String>, tone: EventTone) {
        self.last_event = Some(text.into());
        self.last_event_tone = Some(tone);
    }
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

/// A graded answer held back until its round resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundAnswer {
    pub correct: bool,
    pub submitted_at: u64,
}

/// Synchronized round for simultaneous-reveal modes.
///
/// Who has answered is public; whether they were right is not, so
/// `answers` never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub index: u32,
    pub card_id: String,
    pub started_at: u64,
    pub ends_at: u64,
    pub submitted: BTreeSet<PlayerId>,
    #[serde(skip)]
    pub answers: BTreeMap<PlayerId, RoundAnswer>,
}

impl RoundState {
    pub fn new(index: u32, card: &Card, started_at: u64, ends_at: u64) -> Self {
        Self {
            index,
            card_id: card.id.clone(),
            started_at,
            ends_at,
            submitted: BTreeSet::new(),
            answers: BTreeMap::new(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.ends_at.saturating_sub(self.started_at)
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One hosted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub code: RoomCode,
    pub mode: GameMode,
    pub status: GameStatus,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub paused_at: Option<u64>,
    pub host_id: PlayerId,
    pub settings: GameSettings,
    pub deck: Deck,
    /// Join order. Host migration picks the earliest connected entry.
    pub players: Vec<GamePlayer>,
    pub round: Option<RoundState>,
    /// When the duration cap ends the game, shifted forward by pauses.
    pub ends_at: Option<u64>,
    pub winner_id: Option<PlayerId>,
}

impl GameSession {
    /// A fresh lobby whose only player is the host.
    pub fn new(
        code: RoomCode,
        mode: GameMode,
        settings: GameSettings,
        deck: Deck,
        host: GamePlayer,
        now: u64,
    ) -> Self {
        Self {
            code,
            mode,
            status: GameStatus::Lobby,
            created_at: now,
            started_at: None,
            ended_at: None,
            paused_at: None,
            host_id: host.id.clone(),
            settings,
            deck,
            players: vec![host],
            round: None,
            ends_at: None,
            winner_id: None,
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&GamePlayer> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut GamePlayer> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        &self.host_id == id
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// Earliest-joined connected player, the host migration target.
    pub fn earliest_connected(&self) -> Option<&GamePlayer> {
        self.players
            .iter()
            .filter(|p| p.connected)
            .min_by_key(|p| p.joined_at)
    }

    /// The card a player is currently answering.
    pub fn current_card(&self, player: &GamePlayer) -> Option<&Card> {
        self.deck.card_at(player.current_index)
    }

    /// The snapshot as `viewer` is allowed to see it: other players'
    /// narrated outcomes are stripped.
    pub fn view_for(&self, viewer: &PlayerId) -> GameSession {
        let mut view = self.clone();
        for player in view.players.iter_mut().filter(|p| &p.id != viewer) {
            player.last_event = None;
            player.last_event_tone = None;
        }
        view
    }
}

// =========================================================================
// Tests
// =========================================================================
