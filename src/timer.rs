//! Phase countdown with a pause/resume accumulator.
//!
//! A countdown never owns a task: the phase ticker polls it against the
//! clock, and the round state machine replaces or drops it on every phase
//! change, so an expired countdown can only ever belong to the current phase.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: Duration,
    /// Time accumulated across completed running stretches
    banked: Duration,
    /// Start of the current running stretch (None while paused)
    running_since: Option<Instant>,
}

impl Countdown {
    pub fn start(total: Duration, now: Instant) -> Self {
        Self {
            total,
            banked: Duration::ZERO,
            running_since: Some(now),
        }
    }

    /// A countdown created while the game is paused stays frozen until resumed
    pub fn start_paused(total: Duration) -> Self {
        Self {
            total,
            banked: Duration::ZERO,
            running_since: None,
        }
    }

    pub fn from_seconds(seconds: u32, now: Instant, paused: bool) -> Self {
        let total = Duration::from_secs(u64::from(seconds));
        if paused {
            Self::start_paused(total)
        } else {
            Self::start(total, now)
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn is_paused(&self) -> bool {
        self.running_since.is_none()
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.banked += now.saturating_duration_since(since);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let running = self
            .running_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        self.banked + running
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.total.saturating_sub(self.elapsed(now))
    }

    /// Remaining time rounded up to whole seconds, as shown to players
    pub fn remaining_secs(&self, now: Instant) -> u32 {
        let remaining = self.remaining(now);
        let whole = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        u32::try_from(whole).unwrap_or(u32::MAX)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}
