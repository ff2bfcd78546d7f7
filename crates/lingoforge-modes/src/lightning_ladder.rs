//! Lightning Ladder: climb by answering fast.
//!
//! A correct answer climbs `base_step` rungs scaled by speed; a wrong one
//! slips a single rung. First to the top rung wins outright, otherwise the
//! highest position when time runs out.

use std::cmp::Ordering;

use lingoforge_protocol::{
    EventTone, GameEvent, GameMode, GamePlayer, GameSession, PlayerAction, PlayerId, Recipient,
};

use crate::engine::{self, ActionContext, Events, ModeEngine};
use crate::{LadderRules, ModeError, grade};

pub struct LightningLadder {
    rules: LadderRules,
}

impl LightningLadder {
    pub fn new(rules: LadderRules) -> Self {
        Self { rules }
    }

    /// Rungs gained for a correct answer that took `elapsed_ms` out of a
    /// `window_ms` answer window.
    pub fn climb(&self, window_ms: u64, elapsed_ms: u64) -> u32 {
        let multiplier = (window_ms.max(1) as f64 / elapsed_ms.max(1) as f64)
            .clamp(self.rules.min_multiplier, self.rules.max_multiplier);
        ((self.rules.base_step as f64 * multiplier).round() as u32).max(1)
    }
}

impl ModeEngine for LightningLadder {
    fn mode(&self) -> GameMode {
        GameMode::LightningLadder
    }

    fn initialize(&self, session: &mut GameSession, now: u64) {
        for player in &mut session.players {
            engine::reset_progress(player, now);
            player.ladder_position = 0;
            player.ladder_peak = 0;
        }
    }

    fn admit_player(&self, _session: &GameSession, player: &mut GamePlayer, now: u64) {
        engine::reset_progress(player, now);
    }

    fn apply_action(
        &self,
        session: &mut GameSession,
        player_id: &PlayerId,
        action: PlayerAction,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Events, ModeError> {
        let PlayerAction::Answer { card_id, response } = &action else {
            return Err(engine::unsupported(self.mode(), &action));
        };
        let card = engine::current_card(session, player_id, card_id)?;
        let direction = session.settings.direction;
        let window_ms = u64::from(session.settings.seconds_per_question.max(1)) * 1000;
        let top = self.rules.top_rung;
        let correct = grade(&card, direction, response);

        let player = engine::player_mut(session, player_id)?;
        let from = player.ladder_position;
        let elapsed = ctx
            .now
            .saturating_sub(player.card_started_at.unwrap_or(ctx.now));

        if correct {
            let step = self.climb(window_ms, elapsed);
            player.correct += 1;
            player.ladder_position = (from + step).min(top);
            player.ladder_peak = player.ladder_peak.max(player.ladder_position);
            let text = if player.ladder_position >= top {
                "Correct! You reached the top!".to_string()
            } else {
                format!("Correct! Up {} rung(s).", player.ladder_position - from)
            };
            player.narrate(text, EventTone::Positive);
        } else {
            player.incorrect += 1;
            player.ladder_position = from.saturating_sub(1);
            player.narrate(
                format!("Not quite: \"{}\".", card.expected(direction)),
                EventTone::Negative,
            );
        }
        let to = player.ladder_position;
        engine::advance(player, ctx.now);

        Ok(vec![
            (
                Recipient::Player(player_id.clone()),
                GameEvent::AnswerGraded {
                    player_id: player_id.clone(),
                    card_id: card.id.clone(),
                    correct,
                    expected: (!correct).then(|| card.expected(direction).to_string()),
                },
            ),
            (
                Recipient::All,
                GameEvent::LadderMoved {
                    player_id: player_id.clone(),
                    from,
                    to,
                },
            ),
        ])
    }

    fn check_win_condition(&self, session: &GameSession) -> bool {
        session
            .players
            .iter()
            .any(|p| p.ladder_position >= self.rules.top_rung)
    }

    fn compare(&self, a: &GamePlayer, b: &GamePlayer) -> Ordering {
        b.ladder_position
            .cmp(&a.ladder_position)
            .then(b.ladder_peak.cmp(&a.ladder_peak))
    }

    fn metric_names(&self) -> (&'static str, &'static str) {
        ("ladder_position", "ladder_peak")
    }

    fn metrics(&self, player: &GamePlayer) -> (u32, u32) {
        (player.ladder_position, player.ladder_peak)
    }
}
