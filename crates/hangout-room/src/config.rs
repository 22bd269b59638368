//! Room configuration and status state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Server-wide room settings.
///
/// These are the same for every game. Per-game settings (board size,
/// player limits, auto-caller period) live in each engine's `Config`.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long an empty room waits for someone to come back before its
    /// actor shuts down.
    pub reap_grace: Duration,

    /// Delay between `room-terminated` and the room actually closing, so
    /// the notice reaches every member first.
    pub teardown_delay: Duration,

    /// Delay before an automatically continued game starts its next round.
    pub next_round_delay: Duration,

    /// Stored chat lines per room (oldest evicted first).
    pub chat_capacity: usize,

    /// Stored round summaries per room (oldest evicted first).
    pub history_capacity: usize,

    /// Longest chat line accepted, in characters, after trimming.
    pub max_message_len: usize,

    /// Longest display name accepted, in characters, after trimming.
    pub max_name_len: usize,

    /// Capacity of each room actor's command mailbox.
    pub mailbox_size: usize,

    /// Whether the author of a chat line receives their own `new-message`.
    pub echo_chat: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            reap_grace: Duration::from_secs(30),
            teardown_delay: Duration::from_secs(2),
            next_round_delay: Duration::from_secs(3),
            chat_capacity: 50,
            history_capacity: 50,
            max_message_len: 200,
            max_name_len: 32,
            mailbox_size: 64,
            echo_chat: true,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomLimits
// ---------------------------------------------------------------------------

/// Seat limits for one room, decided by its engine and variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLimits {
    /// Players needed before a round can be played.
    pub min_players: usize,
    /// Seats in the room.
    pub max_players: usize,
}

impl RoomLimits {
    /// Builds limits, forcing `1 <= min <= max`.
    pub fn new(min_players: usize, max_players: usize) -> Self {
        let max_players = max_players.max(1);
        Self {
            min_players: min_players.clamp(1, max_players),
            max_players,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
///            enough players            round ends
/// Waiting ─────────────────→ Playing ─────────────→ Finished
///    ↑  ←──── below minimum ───┘  ↑ ←── reset / auto ──┘
///    │                            │
///    └────────── Stopped ─────────┘   (stop from anywhere,
///                                      restart to leave)
/// ```
///
/// - **Waiting**: accepting joins, not enough players for a round yet.
/// - **Playing**: a round is in progress; moves are accepted.
/// - **Finished**: the round ended; the board stays visible until the
///   next round starts.
/// - **Stopped**: a member stopped the session (or closed the room).
///   Nothing moves until someone restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
    Stopped,
}

impl RoomStatus {
    /// Returns `true` if moves are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns `true` if transitioning to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomStatus::*;
        match (self, target) {
            (Waiting, Playing) => true,
            (Playing, Finished | Waiting) => true,
            (Finished, Playing | Waiting) => true,
            (Stopped, Playing | Waiting) => true,
            (Waiting | Playing | Finished, Stopped) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
