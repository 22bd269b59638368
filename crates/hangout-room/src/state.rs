//! The room aggregate: everything one game instance needs to be rendered
//! and continued.

use hangout_protocol::{ChatMessage, ConnectionId, RoomCode, now_millis};
use hangout_session::Outcome;
use serde::Serialize;

use crate::{BoundedLog, GameEngine, RoomConfig, RoomLimits, RoomStatus};

/// One seat in a room.
///
/// `conn` is the ownership key. It changes when someone with the same
/// display name takes the seat over from a new connection; everything else
/// stays.
#[derive(Debug, Clone)]
pub struct Player<R> {
    pub conn: ConnectionId,
    pub display_name: String,
    /// Engine-specific role: a mark, a bingo card, a colour and score.
    pub role: R,
    pub joined_at: u64,
}

/// Why a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Somebody won outright.
    Win,
    /// Nobody won, or several players tied for first.
    Draw,
    /// Bingo: a card was fully marked.
    FullHouse,
    /// Bingo: the configured number of distinct winners was reached.
    WinnerLimit,
    /// Bingo: every number in the pool was called.
    PoolExhausted,
    /// Dots-and-boxes: every box is claimed.
    BoardComplete,
}

/// The result of [`GameEngine::check_end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEnd {
    pub reason: EndReason,
    /// Winning connections, possibly several (shared win), possibly none.
    pub winners: Vec<ConnectionId>,
    /// Per-player outcome fed into the stats tracker.
    pub standings: Vec<(ConnectionId, Outcome)>,
}

/// A finished round, kept in the room's history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary<B> {
    pub round: u32,
    pub winners: Vec<String>,
    pub reason: EndReason,
    pub board: B,
    pub finished_at: u64,
}

/// Authoritative state for one room.
///
/// Owned by exactly one [`RoomSession`](crate::RoomSession), which in turn
/// lives inside one room actor, so nothing here needs locking.
pub struct Room<E: GameEngine> {
    pub code: RoomCode,
    pub config: E::Config,
    pub limits: RoomLimits,
    pub status: RoomStatus,
    /// Join order. Turn rotation and role assignment depend on it.
    pub players: Vec<Player<E::Role>>,
    pub board: E::Board,
    /// Completed rounds. Never decreases.
    pub round_count: u32,
    pub history: BoundedLog<RoundSummary<E::Board>>,
    pub chat: BoundedLog<ChatMessage>,
    pub created_at: u64,
    pub last_activity_at: u64,
    next_message_id: u64,
}

impl<E: GameEngine> Room<E> {
    /// Creates an empty room in `Waiting`.
    pub fn new(code: RoomCode, config: E::Config, settings: &RoomConfig) -> Self {
        let now = now_millis();
        let limits = E::limits(&config);
        let board = E::new_board(&config);
        Self {
            code,
            config,
            limits,
            status: RoomStatus::Waiting,
            players: Vec::new(),
            board,
            round_count: 0,
            history: BoundedLog::new(settings.history_capacity),
            chat: BoundedLog::new(settings.chat_capacity),
            created_at: now,
            last_activity_at: now,
            next_message_id: 1,
        }
    }

    pub fn index_of(&self, conn: ConnectionId) -> Option<usize> {
        self.players.iter().position(|p| p.conn == conn)
    }

    pub fn player(&self, conn: ConnectionId) -> Option<&Player<E::Role>> {
        self.players.iter().find(|p| p.conn == conn)
    }

    pub fn player_mut(&mut self, conn: ConnectionId) -> Option<&mut Player<E::Role>> {
        self.players.iter_mut().find(|p| p.conn == conn)
    }

    /// Seat index of the player with this display name (exact match).
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.display_name == name)
    }

    /// Display name for a connection, or `"unknown"`.
    pub fn name_of(&self, conn: ConnectionId) -> &str {
        self.player(conn)
            .map(|p| p.display_name.as_str())
            .unwrap_or("unknown")
    }

    pub fn is_member(&self, conn: ConnectionId) -> bool {
        self.index_of(conn).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.limits.max_players
    }

    /// Enough players seated to play a round.
    pub fn has_quorum(&self) -> bool {
        self.players.len() >= self.limits.min_players
    }

    pub fn conns(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(|p| p.conn)
    }

    /// Marks the room as used just now (for the idle sweep).
    pub fn touch(&mut self) {
        self.last_activity_at = now_millis();
    }

    /// Stores a chat line and returns the stored copy.
    pub fn push_chat(&mut self, author: &str, text: &str) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_message_id,
            author: author.to_string(),
            text: text.to_string(),
            timestamp: now_millis(),
        };
        self.next_message_id += 1;
        self.chat.push(message.clone());
        message
    }
}
