//! Survival Sprint: everyone answers the same card against the clock.
//!
//! Each round shows one card to every surviving player. Answers are graded
//! on arrival but kept private; the round resolves once every connected
//! survivor has answered or the deadline passes, whichever comes first.
//! Correct answers earn a bonus that shrinks toward the deadline; wrong or
//! missing answers cost a heart. Players at zero hearts are eliminated.
//!
//! The last survivor wins. Solo games end when the only player runs out
//! of hearts.

use std::cmp::Ordering;

use lingoforge_protocol::{
    EventTone, GameEvent, GameMode, GamePlayer, GameSession, PlayerAction, PlayerId, Recipient,
    RoundAnswer, RoundResult, RoundState,
};

use crate::engine::{self, ActionContext, Events, ModeEngine};
use crate::{ModeError, SprintRules, grade};

pub struct SurvivalSprint {
    rules: SprintRules,
}

impl SurvivalSprint {
    pub fn new(rules: SprintRules) -> Self {
        Self { rules }
    }

    /// Bonus for a correct answer with `remaining_ms` of `duration_ms` left.
    pub fn bonus(&self, remaining_ms: u64, duration_ms: u64) -> u32 {
        let (min, max) = (self.rules.min_bonus, self.rules.max_bonus.max(self.rules.min_bonus));
        if duration_ms == 0 {
            return min;
        }
        let remaining = remaining_ms.min(duration_ms);
        min + (u64::from(max - min) * remaining / duration_ms) as u32
    }

    /// Opens round `index` for every survivor.
    fn start_round(&self, session: &mut GameSession, index: u32, now: u64) {
        let Some(card) = session.deck.card_at(index).cloned() else {
            session.round = None;
            return;
        };
        let ends_at = now + u64::from(session.settings.seconds_per_question.max(1)) * 1000;
        for player in session.players.iter_mut().filter(|p| !p.eliminated) {
            player.current_index = index;
            player.card_started_at = Some(now);
        }
        session.round = Some(RoundState::new(index, &card, now, ends_at));
    }

    /// Every connected survivor has answered.
    fn everyone_answered(session: &GameSession) -> bool {
        let Some(round) = &session.round else {
            return false;
        };
        let mut waiting_on = session
            .players
            .iter()
            .filter(|p| p.connected && !p.eliminated)
            .peekable();
        waiting_on.peek().is_some() && waiting_on.all(|p| round.submitted.contains(&p.id))
    }

    /// Scores the open round and, unless the game is decided, opens the
    /// next one.
    fn resolve(&self, session: &mut GameSession, now: u64) -> Events {
        let Some(round) = session.round.take() else {
            return Vec::new();
        };
        let duration = round.duration_ms();
        let mut results = Vec::new();
        let mut events = Vec::new();

        for player in session.players.iter_mut().filter(|p| !p.eliminated) {
            let answer = round.answers.get(&player.id);
            let correct = answer.is_some_and(|a| a.correct);
            let bonus = match answer {
                Some(RoundAnswer {
                    correct: true,
                    submitted_at,
                }) => {
                    let bonus = self.bonus(round.ends_at.saturating_sub(*submitted_at), duration);
                    player.correct += 1;
                    player.score += bonus;
                    player.narrate(format!("Correct! +{bonus} points."), EventTone::Positive);
                    bonus
                }
                _ => {
                    player.incorrect += 1;
                    player.hearts = player.hearts.saturating_sub(1);
                    if player.hearts == 0 {
                        player.eliminated = true;
                        player.narrate("Out of hearts. You're eliminated.", EventTone::Negative);
                        events.push((
                            Recipient::All,
                            GameEvent::PlayerEliminated {
                                player_id: player.id.clone(),
                            },
                        ));
                    } else if answer.is_some() {
                        player.narrate("Wrong! You lost a heart.", EventTone::Negative);
                    } else {
                        player.narrate("Too slow! You lost a heart.", EventTone::Negative);
                    }
                    0
                }
            };
            results.push(RoundResult {
                player_id: player.id.clone(),
                answered: answer.is_some(),
                correct,
                bonus,
                hearts: player.hearts,
            });
        }

        tracing::debug!(code = %session.code, round = round.index, "sprint round resolved");
        events.insert(
            0,
            (
                Recipient::All,
                GameEvent::RoundResolved {
                    round: round.index,
                    results,
                },
            ),
        );

        if !self.check_win_condition(session) {
            self.start_round(session, round.index + 1, now);
        }
        events
    }
}

impl ModeEngine for SurvivalSprint {
    fn mode(&self) -> GameMode {
        GameMode::SurvivalSprint
    }

    fn initialize(&self, session: &mut GameSession, now: u64) {
        for player in &mut session.players {
            engine::reset_progress(player, now);
            player.hearts = self.rules.starting_hearts;
            player.score = 0;
            player.eliminated = false;
        }
        self.start_round(session, 0, now);
    }

    fn admit_player(&self, session: &GameSession, player: &mut GamePlayer, now: u64) {
        engine::reset_progress(player, now);
        player.hearts = self.rules.starting_hearts;
        if let Some(round) = &session.round {
            player.current_index = round.index;
        }
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
        if engine::player_mut(session, player_id)?.eliminated {
            return Err(ModeError::Eliminated);
        }
        let round = session.round.as_ref().ok_or(ModeError::NoActiveRound)?;
        if round.submitted.contains(player_id) {
            return Err(ModeError::AlreadyAnswered);
        }
        let card = engine::current_card(session, player_id, card_id)?;
        let correct = grade(&card, session.settings.direction, response);

        let round = session.round.as_mut().ok_or(ModeError::NoActiveRound)?;
        round.submitted.insert(player_id.clone());
        round.answers.insert(
            player_id.clone(),
            RoundAnswer {
                correct,
                submitted_at: ctx.now,
            },
        );
        engine::player_mut(session, player_id)?
            .narrate("Answer locked in.", EventTone::Neutral);

        if Self::everyone_answered(session) {
            Ok(self.resolve(session, ctx.now))
        } else {
            Ok(Vec::new())
        }
    }

    fn on_round_expired(&self, session: &mut GameSession, now: u64) -> Events {
        self.resolve(session, now)
    }

    fn on_roster_change(&self, session: &mut GameSession, now: u64) -> Events {
        if Self::everyone_answered(session) {
            self.resolve(session, now)
        } else {
            Vec::new()
        }
    }

    fn check_win_condition(&self, session: &GameSession) -> bool {
        let alive = session.players.iter().filter(|p| !p.eliminated).count();
        if session.players.len() >= 2 {
            alive <= 1
        } else {
            alive == 0
        }
    }

    fn compare(&self, a: &GamePlayer, b: &GamePlayer) -> Ordering {
        b.hearts.cmp(&a.hearts).then(b.score.cmp(&a.score))
    }

    fn metric_names(&self) -> (&'static str, &'static str) {
        ("hearts", "score")
    }

    fn metrics(&self, player: &GamePlayer) -> (u32, u32) {
        (player.hearts, player.score)
    }

    fn winner(&self, session: &GameSession) -> Option<PlayerId> {
        if session.players.iter().all(|p| p.eliminated) && session.players.len() < 2 {
            return None;
        }
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

// =========================================================================
// Tests
// =========================================================================
