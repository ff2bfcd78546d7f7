//! The `ModeEngine` trait, the seam between the room coordinator and the
//! scoring rules.

use std::cmp::Ordering;

use lingoforge_protocol::{
    Card, GameEvent, GameMode, GamePlayer, GameSession, PlayerAction, PlayerId, Recipient,
};

use crate::random::RandomSource;
use crate::{LightningLadder, ModeError, ModeRules, SurvivalSprint, WordHeist};

/// Events produced by a transition, each paired with who should see it.
pub type Events = Vec<(Recipient, GameEvent)>;

/// Per-call inputs an engine can't compute itself.
pub struct ActionContext<'a> {
    /// Current time, Unix milliseconds.
    pub now: u64,
    pub rng: &'a mut dyn RandomSource,
}

/// Scoring rules for one game mode.
///
/// The coordinator guarantees the session is `playing` and the acting
/// player is connected before calling [`apply_action`](Self::apply_action);
/// engines validate everything mode-specific. When an engine returns `Err`
/// the coordinator discards whatever the engine wrote, so implementations
/// may fail part-way through.
pub trait ModeEngine: Send + Sync + 'static {
    fn mode(&self) -> GameMode;

    /// Prepares every player for a fresh game. Called on `lobby → playing`.
    fn initialize(&self, session: &mut GameSession, now: u64);

    /// Prepares a player who joins after the game started.
    fn admit_player(&self, session: &GameSession, player: &mut GamePlayer, now: u64);

    /// Applies one player action.
    fn apply_action(
        &self,
        session: &mut GameSession,
        player_id: &PlayerId,
        action: PlayerAction,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Events, ModeError>;

    /// The synchronized round deadline passed. Default: nothing happens.
    fn on_round_expired(&self, _session: &mut GameSession, _now: u64) -> Events {
        Vec::new()
    }

    /// Someone connected, disconnected, or joined. Default: nothing happens.
    fn on_roster_change(&self, _session: &mut GameSession, _now: u64) -> Events {
        Vec::new()
    }

    /// Returns `true` when the mode's own win condition is met and the
    /// game should end now.
    fn check_win_condition(&self, session: &GameSession) -> bool;

    /// Standings order: `Less` means `a` ranks above `b`.
    fn compare(&self, a: &GamePlayer, b: &GamePlayer) -> Ordering;

    /// Column names for the two standings metrics.
    fn metric_names(&self) -> (&'static str, &'static str);

    /// The two standings metrics for a player.
    fn metrics(&self, player: &GamePlayer) -> (u32, u32);

    /// The winner, if exactly one player ranks first.
    fn winner(&self, session: &GameSession) -> Option<PlayerId> {
        let mut ranked: Vec<&GamePlayer> = session.players.iter().collect();
        ranked.sort_by(|a, b| self.compare(a, b));
        match ranked.as_slice() {
            [only] => Some(only.id.clone()),
            [first, second, ..] if self.compare(first, second) == Ordering::Less => {
                Some(first.id.clone())
            }
            _ => None,
        }
    }
}

/// Builds the engine for `mode`.
pub fn engine_for(mode: GameMode, rules: &ModeRules) -> Box<dyn ModeEngine> {
    match mode {
        GameMode::WordHeist => Box::new(WordHeist::new(rules.heist.clone())),
        GameMode::LightningLadder => Box::new(LightningLadder::new(rules.ladder.clone())),
        GameMode::SurvivalSprint => Box::new(SurvivalSprint::new(rules.sprint.clone())),
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the engines
// ---------------------------------------------------------------------------

pub(crate) fn player_mut<'a>(
    session: &'a mut GameSession,
    id: &PlayerId,
) -> Result<&'a mut GamePlayer, ModeError> {
    session
        .player_mut(id)
        .ok_or_else(|| ModeError::UnknownPlayer(id.clone()))
}

/// The card at the player's position, checked against the id they answered.
pub(crate) fn current_card(
    session: &GameSession,
    player_id: &PlayerId,
    card_id: &str,
) -> Result<Card, ModeError> {
    let player = session
        .player(player_id)
        .ok_or_else(|| ModeError::UnknownPlayer(player_id.clone()))?;
    let card = session.current_card(player).ok_or(ModeError::EmptyDeck)?;
    if card.id != card_id {
        return Err(ModeError::WrongCard {
            expected: card.id.clone(),
            got: card_id.to_string(),
        });
    }
    Ok(card.clone())
}

/// Moves a player to the next card.
pub(crate) fn advance(player: &mut GamePlayer, now: u64) {
    player.current_index += 1;
    player.card_started_at = Some(now);
    player.pending_decision = false;
}

/// Common reset at game start.
pub(crate) fn reset_progress(player: &mut GamePlayer, now: u64) {
    player.current_index = 0;
    player.card_started_at = Some(now);
    player.pending_decision = false;
}

pub(crate) fn unsupported(mode: GameMode, action: &PlayerAction) -> ModeError {
    let action = match action {
        PlayerAction::Answer { .. } => "answer",
        PlayerAction::Bank => "bank",
        PlayerAction::Risk => "risk",
        PlayerAction::Steal { .. } => "steal",
    };
    ModeError::Unsupported { mode, action }
}
