//! Deadlines for Lingoforge rooms.
//!
//! Rooms don't run a tick loop; they only need to wake up when something is
//! due (a Survival Sprint round closing, the duration cap, idle eviction).
//!
//! - [`Clock`]: Unix-millisecond timestamps for snapshots, derived from
//!   tokio's clock so paused-time tests see time move.
//! - [`RoundTimer`]: one pausable deadline.
//!
//! # Integration
//!
//! A timer sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         () = round_timer.expired() => { /* resolve the round */ }
//!     }
//! }
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{self, Instant as TokioInstant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock milliseconds anchored to a tokio instant.
///
/// The Unix time is read once at construction; after that the clock only
/// advances with tokio time. Timestamps written into snapshots and
/// deadlines armed on timers therefore always agree.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin_ms: u64,
    origin: TokioInstant,
}

impl Clock {
    pub fn new() -> Self {
        let origin_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self::starting_at(origin_ms)
    }

    /// A clock that reads `origin_ms` right now.
    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            origin_ms,
            origin: TokioInstant::now(),
        }
    }

    /// Current time in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.origin_ms + self.origin.elapsed().as_millis() as u64
    }

    /// The tokio instant corresponding to a Unix-millisecond timestamp.
    /// Timestamps before the clock's origin map to the origin.
    pub fn instant_at(&self, at_ms: u64) -> TokioInstant {
        self.origin + Duration::from_millis(at_ms.saturating_sub(self.origin_ms))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RoundTimer
// ---------------------------------------------------------------------------

/// A single deadline that can be armed, paused, resumed, and cancelled.
///
/// [`expired`](Self::expired) pends forever while the timer is disarmed or
/// paused, so it can sit in a `select!` unconditionally.
#[derive(Debug)]
pub struct RoundTimer {
    name: &'static str,
    deadline: Option<TokioInstant>,
    /// Time left when paused. `Some` means paused.
    frozen: Option<Duration>,
}

impl RoundTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            deadline: None,
            frozen: None,
        }
    }

    /// Arms the timer to fire `after` from now, replacing any earlier
    /// deadline and clearing a pause.
    pub fn arm(&mut self, after: Duration) {
        self.arm_at(TokioInstant::now() + after);
    }

    /// Arms the timer to fire at `deadline`.
    pub fn arm_at(&mut self, deadline: TokioInstant) {
        trace!(timer = self.name, "armed");
        self.deadline = Some(deadline);
        self.frozen = None;
    }

    /// Disarms the timer. Idempotent.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() || self.frozen.take().is_some() {
            trace!(timer = self.name, "cancelled");
        }
    }

    /// Freezes the remaining time. Idempotent; no effect when disarmed.
    pub fn pause(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            self.frozen = Some(deadline.saturating_duration_since(TokioInstant::now()));
            trace!(timer = self.name, "paused");
        }
    }

    /// Re-arms with whatever time was left at [`pause`](Self::pause).
    pub fn resume(&mut self) {
        if let Some(left) = self.frozen.take() {
            self.deadline = Some(TokioInstant::now() + left);
            trace!(timer = self.name, "resumed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some() || self.frozen.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    /// Time until the deadline, or the frozen remainder while paused.
    pub fn remaining(&self) -> Option<Duration> {
        match (self.deadline, self.frozen) {
            (Some(deadline), _) => Some(deadline.saturating_duration_since(TokioInstant::now())),
            (None, frozen) => frozen,
        }
    }

    /// Completes when the deadline passes, disarming the timer.
    ///
    /// Cancel-safe: dropping the future leaves the timer armed.
    pub async fn expired(&mut self) {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            return;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
        trace!(timer = self.name, "fired");
    }
}
