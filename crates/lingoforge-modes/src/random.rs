//! Injectable randomness.
//!
//! Only Word Heist steals roll dice. Engines take a `&mut dyn RandomSource`
//! so rooms can use a seeded generator and tests can script outcomes.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of biased coin flips.
pub trait RandomSource: Send {
    /// Returns `true` with probability `p` (clamped to `0.0..=1.0`).
    fn chance(&mut self, p: f64) -> bool;
}

/// [`RandomSource`] backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Reproducible sequence from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn chance(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.rng.random_bool(p)
    }
}

/// Replays a fixed list of outcomes, then answers `false` forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    outcomes: VecDeque<bool>,
    rolls: usize,
}

impl ScriptedRandom {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            rolls: 0,
        }
    }

    /// How many times [`chance`](RandomSource::chance) was called.
    pub fn rolls(&self) -> usize {
        self.rolls
    }
}

impl RandomSource for ScriptedRandom {
    fn chance(&mut self, _p: f64) -> bool {
        self.rolls += 1;
        self.outcomes.pop_front().unwrap_or(false)
    }
}
