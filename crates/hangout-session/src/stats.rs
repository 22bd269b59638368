//! Per-connection win/loss/streak counters.
//!
//! Stats belong to a connection, not to a room: a player keeps them across
//! every round they play on one socket, and they disappear when the socket
//! does. The one exception is a seat takeover (same display name joining
//! from a new socket), which moves the record over with [`StatsTracker::rebind`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hangout_protocol::ConnectionId;
use serde::Serialize;

/// The result of one finished round for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Won the round (or shared a win).
    Win,
    /// Lost the round.
    Loss,
    /// Drew.
    Tie,
}

/// Running counters for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub games_played: u32,
    /// Consecutive wins. A loss resets it, a tie leaves it alone.
    pub current_streak: u32,
    /// Highest `current_streak` ever reached.
    pub best_streak: u32,
}

impl StatsRecord {
    /// Folds one round outcome into the counters.
    pub fn record(&mut self, outcome: Outcome) {
        self.games_played += 1;
        match outcome {
            Outcome::Win => {
                self.wins += 1;
                self.current_streak += 1;
                self.best_streak = self.best_streak.max(self.current_streak);
            }
            Outcome::Loss => {
                self.losses += 1;
                self.current_streak = 0;
            }
            Outcome::Tie => {
                self.ties += 1;
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    display_name: String,
    record: StatsRecord,
}

/// Process-wide stats store.
///
/// Cheap to clone; every clone shares the same map. Each key is only ever
/// written by the room actor that currently seats that connection, so the
/// lock is held for a few instructions at a time and never across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    entries: Arc<Mutex<HashMap<ConnectionId, Entry>>>,
}

impl StatsTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ConnectionId, Entry>> {
        // A panic while holding this lock cannot leave a counter half
        // written, so a poisoned map is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the record for `conn`, creating an empty one on first use.
    /// The stored display name follows the latest join.
    pub fn get_or_create(&self, conn: ConnectionId, display_name: &str) -> StatsRecord {
        let mut entries = self.entries();
        let entry = entries.entry(conn).or_insert_with(|| Entry {
            display_name: display_name.to_string(),
            record: StatsRecord::default(),
        });
        if entry.display_name != display_name {
            entry.display_name = display_name.to_string();
        }
        entry.record.clone()
    }

    /// Applies a round outcome. Returns the updated record, or `None` if
    /// the connection has no record.
    pub fn update(&self, conn: ConnectionId, outcome: Outcome) -> Option<StatsRecord> {
        let mut entries = self.entries();
        let entry = entries.get_mut(&conn)?;
        entry.record.record(outcome);
        tracing::debug!(
            %conn,
            player = %entry.display_name,
            ?outcome,
            wins = entry.record.wins,
            streak = entry.record.current_streak,
            "stats updated"
        );
        Some(entry.record.clone())
    }

    /// Current record for `conn`.
    pub fn get(&self, conn: ConnectionId) -> Option<StatsRecord> {
        self.entries().get(&conn).map(|e| e.record.clone())
    }

    /// Moves the record of `old` to `new` (seat takeover).
    ///
    /// Any record `new` already had is replaced. Returns `false` when `old`
    /// had nothing to move.
    pub fn rebind(&self, old: ConnectionId, new: ConnectionId) -> bool {
        let mut entries = self.entries();
        match entries.remove(&old) {
            Some(entry) => {
                entries.insert(new, entry);
                true
            }
            None => false,
        }
    }

    /// Drops the record of a departed connection.
    pub fn remove(&self, conn: ConnectionId) -> Option<StatsRecord> {
        self.entries().remove(&conn).map(|e| e.record)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
