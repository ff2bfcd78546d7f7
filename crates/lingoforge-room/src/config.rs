//! Room configuration.

use std::time::Duration;

use lingoforge_modes::ModeRules;

/// Settings shared by every room a [`SessionStore`](crate::SessionStore)
/// creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Bounded command channel size per room.
    pub mailbox_size: usize,

    /// A room with no connected players is evicted after this long.
    pub idle_timeout: Duration,

    /// An ended room stays readable (standings export) for this long.
    pub ended_grace: Duration,

    /// Fixed seed for steal rolls. `None` seeds from the OS per room.
    pub rng_seed: Option<u64>,

    /// Longest accepted display name, in characters.
    pub max_name_len: usize,

    pub rules: ModeRules,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mailbox_size: 64,
            idle_timeout: Duration::from_secs(10 * 60),
            ended_grace: Duration::from_secs(5 * 60),
            rng_seed: None,
            max_name_len: 32,
            rules: ModeRules::default(),
        }
    }
}

impl RoomConfig {
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_ended_grace(mut self, grace: Duration) -> Self {
        self.ended_grace = grace;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_rules(mut self, rules: ModeRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_mailbox_size(mut self, size: usize) -> Self {
        self.mailbox_size = size.max(1);
        self
    }
}
