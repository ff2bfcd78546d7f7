//! Tunable constants for each mode.

use lingoforge_protocol::GameMode;

/// Word Heist constants.
#[derive(Debug, Clone, PartialEq)]
pub struct HeistRules {
    /// Probability an unshielded steal succeeds.
    pub steal_chance: f64,
    /// Banking at least this many keys at once grants a shield.
    pub shield_threshold: u32,
}

impl Default for HeistRules {
    fn default() -> Self {
        Self {
            steal_chance: 0.5,
            shield_threshold: 3,
        }
    }
}

/// Lightning Ladder constants.
///
/// A correct answer climbs `base_step × multiplier` rungs (at least one),
/// where the multiplier is the answer window divided by the time taken,
/// clamped to `min_multiplier..=max_multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderRules {
    pub base_step: u32,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Reaching this rung wins.
    pub top_rung: u32,
}

impl Default for LadderRules {
    fn default() -> Self {
        Self {
            base_step: 2,
            min_multiplier: 0.5,
            max_multiplier: 2.0,
            top_rung: 20,
        }
    }
}

/// Survival Sprint constants.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintRules {
    pub starting_hearts: u32,
    /// Bonus for a correct answer submitted at the deadline.
    pub min_bonus: u32,
    /// Bonus for a correct answer submitted the instant the round opens.
    pub max_bonus: u32,
}

impl Default for SprintRules {
    fn default() -> Self {
        Self {
            starting_hearts: 3,
            min_bonus: 10,
            max_bonus: 100,
        }
    }
}

/// Rules for every mode, handed to [`engine_for`](crate::engine_for).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeRules {
    pub heist: HeistRules,
    pub ladder: LadderRules,
    pub sprint: SprintRules,
}

impl ModeRules {
    pub fn with_heist(mut self, heist: HeistRules) -> Self {
        self.heist = heist;
        self
    }

    pub fn with_ladder(mut self, ladder: LadderRules) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn with_sprint(mut self, sprint: SprintRules) -> Self {
        self.sprint = sprint;
        self
    }

    /// The rules in effect for `mode`, formatted for logs.
    pub fn summary(&self, mode: GameMode) -> String {
        match mode {
            GameMode::WordHeist => format!(
                "steal_chance={} shield_threshold={}",
                self.heist.steal_chance, self.heist.shield_threshold
            ),
            GameMode::LightningLadder => format!(
                "base_step={} top_rung={}",
                self.ladder.base_step, self.ladder.top_rung
            ),
            GameMode::SurvivalSprint => format!(
                "hearts={} bonus={}..{}",
                self.sprint.starting_hearts, self.sprint.min_bonus, self.sprint.max_bonus
            ),
        }
    }
}
