//! Word Heist: answer to earn keys, then bank, risk, or steal.
//!
//! ```text
//! answer ─ correct ─→ +1 unbanked, pending decision
//!        │                 ├─ bank  → unbanked moves to banked (big banks earn a shield)
//!        │                 ├─ risk  → keys stay at risk
//!        │                 └─ steal → roll against a target's unbanked keys
//!        └ wrong ───→ unbanked keys dropped
//! ```
//!
//! Every outcome except a correct answer moves the player to the next card.
//! There is no built-in finish line; the host or the duration cap ends the
//! game and banked keys decide it.

use std::cmp::Ordering;

use lingoforge_protocol::{
    EventTone, GameEvent, GameMode, GamePlayer, GameSession, PlayerAction, PlayerId, Recipient,
    StealOutcome,
};

use crate::engine::{self, ActionContext, Events, ModeEngine};
use crate::{HeistRules, ModeError, grade};

pub struct WordHeist {
    rules: HeistRules,
}

impl WordHeist {
    pub fn new(rules: HeistRules) -> Self {
        Self { rules }
    }

    fn answer(
        &self,
        session: &mut GameSession,
        player_id: &PlayerId,
        card_id: &str,
        response: &str,
        now: u64,
    ) -> Result<Events, ModeError> {
        if engine::player_mut(session, player_id)?.pending_decision {
            return Err(ModeError::DecisionPending);
        }
        let card = engine::current_card(session, player_id, card_id)?;
        let direction = session.settings.direction;
        let correct = grade(&card, direction, response);
        let player = engine::player_mut(session, player_id)?;

        let mut events = vec![(
            Recipient::Player(player_id.clone()),
            GameEvent::AnswerGraded {
                player_id: player_id.clone(),
                card_id: card.id.clone(),
                correct,
                expected: (!correct).then(|| card.expected(direction).to_string()),
            },
        )];

        if correct {
            player.correct += 1;
            player.unbanked_keys += 1;
            player.pending_decision = true;
            player.narrate(
                format!(
                    "Correct! {} key(s) at risk. Bank, risk, or steal?",
                    player.unbanked_keys
                ),
                EventTone::Positive,
            );
            events.push((
                Recipient::All,
                GameEvent::KeyEarned {
                    player_id: player_id.clone(),
                    unbanked: player.unbanked_keys,
                },
            ));
        } else {
            player.incorrect += 1;
            let lost = std::mem::take(&mut player.unbanked_keys);
            player.narrate(
                format!(
                    "Not quite: \"{}\". You dropped {lost} key(s).",
                    card.expected(direction)
                ),
                EventTone::Negative,
            );
            engine::advance(player, now);
            if lost > 0 {
                events.push((
                    Recipient::All,
                    GameEvent::KeysDropped {
                        player_id: player_id.clone(),
                        lost,
                    },
                ));
            }
        }
        Ok(events)
    }

    fn bank(&self, player: &mut GamePlayer, now: u64) -> Events {
        let amount = std::mem::take(&mut player.unbanked_keys);
        player.banked_keys += amount;
        if amount >= self.rules.shield_threshold {
            player.shielded = true;
        }
        let text = if amount >= self.rules.shield_threshold {
            format!("Banked {amount} key(s). Shield up!")
        } else {
            format!("Banked {amount} key(s).")
        };
        player.narrate(text, EventTone::Positive);
        engine::advance(player, now);
        vec![(
            Recipient::All,
            GameEvent::Banked {
                player_id: player.id.clone(),
                amount,
                total: player.banked_keys,
                shielded: player.shielded,
            },
        )]
    }

    fn risk(&self, player: &mut GamePlayer, now: u64) -> Events {
        let at_risk = player.unbanked_keys;
        player.narrate(
            format!("Risky! {at_risk} key(s) still up for grabs."),
            EventTone::Neutral,
        );
        engine::advance(player, now);
        vec![(
            Recipient::All,
            GameEvent::RiskTaken {
                player_id: player.id.clone(),
                at_risk,
            },
        )]
    }

    fn steal(
        &self,
        session: &mut GameSession,
        thief_id: &PlayerId,
        target_id: &PlayerId,
        ctx: &mut ActionContext<'_>,
    ) -> Result<Events, ModeError> {
        if thief_id == target_id {
            return Err(ModeError::InvalidTarget("cannot steal from yourself".into()));
        }
        let thief_name = engine::player_mut(session, thief_id)?.name.clone();
        let target = session
            .player_mut(target_id)
            .ok_or_else(|| ModeError::InvalidTarget(format!("{target_id} is not in this session")))?;
        let target_name = target.name.clone();

        let outcome = if target.unbanked_keys == 0 {
            StealOutcome::NothingToSteal
        } else if target.shielded {
            target.shielded = false;
            target.narrate(
                format!("Your shield blocked {thief_name}'s steal."),
                EventTone::Positive,
            );
            StealOutcome::Blocked
        } else if ctx.rng.chance(self.rules.steal_chance) {
            target.unbanked_keys -= 1;
            target.narrate(
                format!("{thief_name} stole one of your keys!"),
                EventTone::Negative,
            );
            StealOutcome::Success
        } else {
            StealOutcome::Failed
        };

        let thief = engine::player_mut(session, thief_id)?;
        let (text, tone) = match outcome {
            StealOutcome::Success => {
                thief.banked_keys += 1;
                (
                    format!("You stole a key from {target_name}!"),
                    EventTone::Positive,
                )
            }
            StealOutcome::Failed => (
                format!("Your steal from {target_name} failed."),
                EventTone::Negative,
            ),
            StealOutcome::Blocked => (
                format!("{target_name}'s shield blocked you."),
                EventTone::Negative,
            ),
            StealOutcome::NothingToSteal => (
                format!("{target_name} has nothing to steal."),
                EventTone::Neutral,
            ),
        };
        thief.narrate(text, tone);
        engine::advance(thief, ctx.now);

        tracing::debug!(thief = %thief_id, target = %target_id, ?outcome, "steal resolved");

        // A failed attempt is only news to the thief.
        let recipient = match outcome {
            StealOutcome::Failed => Recipient::Player(thief_id.clone()),
            _ => Recipient::All,
        };
        Ok(vec![(
            recipient,
            GameEvent::StealResolved {
                thief_id: thief_id.clone(),
                target_id: target_id.clone(),
                outcome,
            },
        )])
    }
}

impl ModeEngine for WordHeist {
    fn mode(&self) -> GameMode {
        GameMode::WordHeist
    }

    fn initialize(&self, session: &mut GameSession, now: u64) {
        for player in &mut session.players {
            engine::reset_progress(player, now);
            player.banked_keys = 0;
            player.unbanked_keys = 0;
            player.shielded = false;
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
        if let PlayerAction::Answer { card_id, response } = &action {
            return self.answer(session, player_id, card_id, response, ctx.now);
        }
        if !engine::player_mut(session, player_id)?.pending_decision {
            return Err(ModeError::NoDecisionPending);
        }
        match action {
            PlayerAction::Bank => Ok(self.bank(engine::player_mut(session, player_id)?, ctx.now)),
            PlayerAction::Risk => Ok(self.risk(engine::player_mut(session, player_id)?, ctx.now)),
            PlayerAction::Steal { target_id } => self.steal(session, player_id, &target_id, ctx),
            other @ PlayerAction::Answer { .. } => Err(engine::unsupported(self.mode(), &other)),
        }
    }

    fn check_win_condition(&self, _session: &GameSession) -> bool {
        false
    }

    fn compare(&self, a: &GamePlayer, b: &GamePlayer) -> Ordering {
        b.banked_keys
            .cmp(&a.banked_keys)
            .then(b.unbanked_keys.cmp(&a.unbanked_keys))
    }

    fn metric_names(&self) -> (&'static str, &'static str) {
        ("banked_keys", "unbanked_keys")
    }

    fn metrics(&self, player: &GamePlayer) -> (u32, u32) {
        (player.banked_keys, player.unbanked_keys)
    }
}

// =========================================================================
// Tests
// =========================================================================
