//! Scoring rules for Lingoforge's three game modes.
//!
//! Engines are plain state-transition functions over a
//! [`GameSession`](lingoforge_protocol::GameSession): no sockets, no timers,
//! no locks. The room coordinator owns the session and calls in.
//!
//! # Key types
//!
//! - [`ModeEngine`]: the trait each mode implements
//! - [`WordHeist`], [`LightningLadder`], [`SurvivalSprint`]: the modes
//! - [`RandomSource`]: injectable randomness for steal rolls
//! - [`ModeRules`]: tunable constants per mode
//! - [`standings`] / [`standings_csv`]: final rankings and export

mod engine;
mod error;
mod grading;
mod lightning_ladder;
mod random;
mod rules;
mod standings;
mod survival_sprint;
mod word_heist;

#[cfg(test)]
mod testing;

pub use engine::{ActionContext, Events, ModeEngine, engine_for};
pub use error::ModeError;
pub use grading::{grade, normalize_answer};
pub use lightning_ladder::LightningLadder;
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use rules::{HeistRules, LadderRules, ModeRules, SprintRules};
pub use standings::{Standing, standings, standings_csv};
pub use survival_sprint::SurvivalSprint;
pub use word_heist::WordHeist;
