//! Room timers for the hangout server.
//!
//! Party games are turn-based, so a room never needs a fixed-rate game
//! loop. What it does need is a handful of deadlines:
//!
//! - "start the next round in 3 s" after a tic-tac-toe win
//! - "reap this room in 30 s" once the last player leaves
//! - "call a bingo number every 5 s" while the auto-caller is on
//!
//! [`Countdown`] covers the one-shot cases and [`Repeater`] the periodic
//! one. Both are plain values owned by the room actor, with no task of
//! their own, so cancelling is just a field write.
//!
//! # Integration
//!
//! Both are designed to sit inside a room actor's `tokio::select!` loop.
//! An idle timer pends forever, so its branch simply never wins:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         () = next_round.fired() => { session.auto_continue(); }
//!         _ = autoplay.next_fire() => { session.autoplay_tick(); }
//!     }
//! }
//! ```
//!
//! Both futures are cancel-safe: dropping one part-way (because another
//! branch won) leaves the deadline untouched.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// A cancellable one-shot deadline.
///
/// Arming an armed countdown replaces the deadline; there is only ever one
/// pending firing.
#[derive(Debug, Default)]
pub struct Countdown {
    deadline: Option<Instant>,
}

impl Countdown {
    /// Creates an idle countdown.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fires once, `after` from now.
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
        debug!(after_ms = after.as_millis() as u64, "countdown armed");
    }

    /// Drops the pending deadline, if any.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            debug!("countdown cancelled");
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the deadline, or `None` when idle.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves when the deadline passes, then disarms.
    ///
    /// Pends forever while idle.
    pub async fn fired(&mut self) {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            return;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
        trace!("countdown fired");
    }
}

// ---------------------------------------------------------------------------
// Repeater
// ---------------------------------------------------------------------------

/// A periodic timer that can be started and stopped.
///
/// Fires every `period` while running. After a late wake-up the next
/// firing is scheduled from now, so a stalled actor never gets a burst of
/// back-to-back firings.
#[derive(Debug)]
pub struct Repeater {
    period: Duration,
    next: Option<Instant>,
    fired: u64,
}

impl Repeater {
    /// Creates a stopped repeater.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: None,
            fired: 0,
        }
    }

    /// Starts (or restarts) the repeater; the first firing is one period
    /// from now.
    pub fn start(&mut self) {
        self.next = Some(Instant::now() + self.period);
        self.fired = 0;
        debug!(period_ms = self.period.as_millis() as u64, "repeater started");
    }

    /// Stops the repeater. Idempotent.
    pub fn stop(&mut self) {
        if self.next.take().is_some() {
            debug!(fired = self.fired, "repeater stopped");
        }
    }

    /// Whether the repeater is running.
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Changes the period. A running repeater keeps its current deadline
    /// and uses the new period from the next firing on.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    /// How many times the repeater fired since it was last started.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Resolves at the next firing and returns the firing number
    /// (starting at 1).
    ///
    /// Pends forever while stopped.
    pub async fn next_fire(&mut self) -> u64 {
        let Some(next) = self.next else {
            std::future::pending::<()>().await;
            return self.fired;
        };
        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        if late_by > self.period {
            debug!(late_ms = late_by.as_millis() as u64, "repeater woke late, skipping ahead");
        }
        self.next = Some(now + self.period);
        self.fired += 1;
        trace!(fired = self.fired, "repeater fired");
        self.fired
    }
}
