//! Throttle bookkeeping: rate window, cooldown countdown, retry backoff
//!
//! All three feed one deadline. The scheduler is either free to admit or
//! throttled until a single instant; a new pause only ever moves that instant
//! later, so two timers never run at once.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;

/// What put the scheduler to sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleReason {
    RateWindow,
    Cooldown,
    Backoff,
}

/// Fixed-duration window capping dispatches, aligned to the scheduler's start
#[derive(Debug)]
pub(crate) struct RateWindow {
    origin: Instant,
    size: Duration,
    limit: Option<u32>,
    start: Instant,
    remaining: u32,
}

impl RateWindow {
    pub(crate) fn new(origin: Instant, size: Duration, limit: Option<u32>) -> Self {
        Self {
            origin,
            size,
            limit,
            start: origin,
            remaining: limit.unwrap_or(0),
        }
    }

    /// Start a fresh window if `now` has moved past the current one
    pub(crate) fn refresh(&mut self, now: Instant) {
        let Some(limit) = self.limit else {
            return;
        };
        if now < self.start + self.size {
            return;
        }

        let size = self.size.as_nanos();
        let elapsed = now.saturating_duration_since(self.origin).as_nanos();
        let aligned = (elapsed / size) * size;
        self.start = self.origin + Duration::from_nanos(aligned as u64);
        self.remaining = limit;
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.limit.is_some() && self.remaining == 0
    }

    pub(crate) fn take(&mut self) {
        if self.limit.is_some() {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    pub(crate) fn resets_at(&self) -> Instant {
        self.start + self.size
    }

    pub(crate) fn remaining(&self) -> Option<u32> {
        self.limit.map(|_| self.remaining)
    }
}

/// Counts completions down to the next mandatory pause
#[derive(Debug)]
pub(crate) struct Cooldown {
    every: Option<u32>,
    pause: Duration,
    countdown: u32,
}

impl Cooldown {
    pub(crate) fn new(every: Option<u32>, pause: Duration) -> Self {
        Self {
            every,
            pause,
            countdown: every.unwrap_or(0),
        }
    }

    /// Record one completed request; true when a pause is due
    pub(crate) fn record(&mut self) -> bool {
        if self.every.is_none() {
            return false;
        }
        self.countdown = self.countdown.saturating_sub(1);
        self.countdown == 0
    }

    pub(crate) fn reset(&mut self) {
        self.countdown = self.every.unwrap_or(0);
    }

    pub(crate) fn pause(&self) -> Duration {
        self.pause
    }
}

/// The single "throttled until" state
#[derive(Debug, Default)]
pub(crate) struct Throttle {
    until: Option<Instant>,
    reason: Option<ThrottleReason>,
    cooldown_pending: bool,
}

impl Throttle {
    pub(crate) fn is_active(&self) -> bool {
        self.until.is_some()
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.until
    }

    pub(crate) fn reason(&self) -> Option<ThrottleReason> {
        self.reason
    }

    /// Sleep until at least `until`; the later deadline wins
    pub(crate) fn extend(&mut self, until: Instant, reason: ThrottleReason) {
        if reason == ThrottleReason::Cooldown {
            self.cooldown_pending = true;
        }
        match self.until {
            Some(current) if current >= until => {}
            _ => {
                self.until = Some(until);
                self.reason = Some(reason);
            }
        }
    }

    /// Clear the deadline; true if a cooldown was covered by it
    pub(crate) fn expire(&mut self) -> bool {
        self.until = None;
        self.reason = None;
        std::mem::take(&mut self.cooldown_pending)
    }
}

/// Smallest backoff unit; a zero unit would let retries fire back to back
const MIN_BACKOFF_UNIT: Duration = Duration::from_millis(1);

/// Backoff before retry number `retry_count` (1-based)
///
/// `unit * retry_count` plus jitter below `unit / 2`, so each retry waits
/// strictly longer than the one before it. The unit is at least 1ms.
pub(crate) fn backoff(unit: Duration, retry_count: u32) -> Duration {
    let unit = unit.max(MIN_BACKOFF_UNIT);
    let jitter_cap = (unit.as_millis() / 2) as u64;
    let jitter = if jitter_cap > 0 {
        rand::rng().random_range(0..jitter_cap)
    } else {
        0
    };
    unit * retry_count + Duration::from_millis(jitter)
}
