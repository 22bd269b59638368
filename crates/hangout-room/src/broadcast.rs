//! What leaves a room: sanitized snapshots, notices and encoded frames.
//!
//! A room never hands its internal state to a socket. It builds a
//! [`RoomSnapshot`] (no timers, no mailbox, no senders), wraps it with any
//! other notice in an [`Envelope`] carrying the room's next sequence
//! number, encodes it once, and fans the same bytes out to every
//! addressed member as an [`Outbound::Frame`].

use std::fmt;
use std::sync::Arc;

use hangout_protocol::{
    ChatMessage, Codec, ConnectionId, Envelope, GameKind, ProtocolError, RoomCode, ServerEvent,
};
use hangout_session::StatsRecord;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{GameEngine, RoomStatus, RoundSummary};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One seat as clients see it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView<R> {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub role: R,
    pub stats: StatsRecord,
    pub joined_at: u64,
}

/// The full sanitized view of a room, sent as `game-state`.
///
/// A client that only ever looks at the latest snapshot can render the
/// room correctly; the other events just say what changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot<R, B> {
    pub room_id: RoomCode,
    pub game: GameKind,
    pub status: RoomStatus,
    pub players: Vec<PlayerView<R>>,
    pub min_players: usize,
    pub max_players: usize,
    pub board: B,
    pub round_count: u32,
    pub auto_play: bool,
    pub history: Vec<RoundSummary<B>>,
    pub chat: Vec<ChatMessage>,
    pub created_at: u64,
    pub last_activity_at: u64,
}

/// The snapshot type of engine `E`.
pub type SnapshotOf<E> = RoomSnapshot<<E as GameEngine>::Role, <E as GameEngine>::Board>;

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// One event a room wants delivered: either a shared server event or an
/// engine event.
pub enum Notice<E: GameEngine> {
    Room(ServerEvent<SnapshotOf<E>>),
    Game(E::Event),
}

impl<E: GameEngine> Notice<E> {
    /// Encodes the notice inside an envelope.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode<C: Codec>(&self, codec: &C, seq: u64, timestamp: u64) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Room(event) => codec.encode(&Envelope { seq, timestamp, payload: event }),
            Self::Game(event) => codec.encode(&Envelope { seq, timestamp, payload: event }),
        }
    }
}

impl<E: GameEngine> Clone for Notice<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Room(event) => Self::Room(event.clone()),
            Self::Game(event) => Self::Game(event.clone()),
        }
    }
}

impl<E: GameEngine> fmt::Debug for Notice<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(event) => f.debug_tuple("Room").field(event).finish(),
            Self::Game(event) => f.debug_tuple("Game").field(event).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Why a room dropped a member on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// Someone with the same display name took the seat over.
    Replaced,
    /// The room closed (terminated, idle, or shut down).
    Closed,
}

/// What a room actor pushes to a connection handler.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// An encoded envelope, shared by every recipient of the same event.
    Frame(Arc<[u8]>),
    /// The room no longer holds this connection.
    Evicted {
        room: RoomCode,
        game: GameKind,
        reason: EvictReason,
    },
}

/// Channel sender for delivering outbound traffic to one connection.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;
