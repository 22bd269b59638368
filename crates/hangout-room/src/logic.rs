//! The `GameEngine` trait, the extension point every game implements.
//!
//! An engine is pure rules: it validates a move against the current
//! [`Room`] and computes the transition, and it decides when a round is
//! over. Everything around it (membership, status changes, stats, chat,
//! timers, broadcasting) is done by the [`RoomSession`](crate::RoomSession)
//! controller, identically for every game.
//!
//! Engines are zero-sized marker types; all methods are associated
//! functions working on the room passed in.

use std::fmt::Debug;
use std::time::Duration;

use hangout_protocol::{ConnectionId, GameKind, MoveRequest, Recipient};
use serde::{Serialize, de::DeserializeOwned};

use crate::{MoveError, Player, Room, RoomLimits, RoundEnd};

/// Events an engine asks the room to deliver.
pub type Outbox<E> = Vec<(Recipient, <E as GameEngine>::Event)>;

/// The rules of one game.
///
/// Each associated type defines the shape of the game's data:
/// - `Config`: variant parameters decoded from `join-room.options`
/// - `Board`: shared per-round state, sent to clients in every snapshot
/// - `Role`: per-player state (mark, card, colour and score)
/// - `Move`: a validated move, built from the raw [`MoveRequest`]
/// - `Event`: engine-specific notifications (`turn-change`, ...)
pub trait GameEngine: Sized + Send + Sync + 'static {
    /// Variant parameters. Missing or invalid options fall back to
    /// `Default`.
    type Config: Default + DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    /// Shared board state. Must not hold anything a client should not see.
    type Board: Serialize + Clone + Debug + Send + Sync + 'static;

    /// Per-seat state.
    type Role: Serialize + Clone + Debug + Send + Sync + 'static;

    /// A decoded move.
    type Move: Debug + Send + 'static;

    /// Engine-specific notifications, serialized with the same
    /// `{"event", "data"}` shape as the shared server events.
    type Event: Serialize + Clone + Debug + Send + Sync + 'static;

    /// Which game this is.
    const KIND: GameKind;

    /// Seat limits for a variant.
    fn limits(config: &Self::Config) -> RoomLimits;

    /// A fresh board for a variant.
    fn new_board(config: &Self::Config) -> Self::Board;

    /// Picks the role for a newcomer, before it is pushed onto
    /// `room.players`. May update the board (e.g. name the first bingo
    /// joiner as caller).
    fn seat(room: &mut Room<Self>, conn: ConnectionId) -> Self::Role;

    /// Accepts the one request shape this game understands.
    ///
    /// # Errors
    /// [`MoveError::Unsupported`] for the other shapes.
    fn decode_move(request: MoveRequest) -> Result<Self::Move, MoveError>;

    /// Validates and applies a move. Only called while the room is
    /// `Playing`.
    ///
    /// # Errors
    /// Any rule violation. The room must be left untouched on error.
    fn apply_move(
        room: &mut Room<Self>,
        sender: ConnectionId,
        mv: Self::Move,
    ) -> Result<Outbox<Self>, MoveError>;

    /// Returns `Some` once the round is over. Must be deterministic.
    fn check_end(room: &Room<Self>) -> Option<RoundEnd>;

    /// Events announcing a finished round. Called after the controller has
    /// recorded the round, so `room.round_count` already includes it.
    fn announce_end(room: &Room<Self>, end: &RoundEnd) -> Outbox<Self>;

    /// Starts a new round: fresh board, fresh per-round role state.
    fn reset(room: &mut Room<Self>);

    /// Repairs turn or caller state after `departed` (formerly at seat
    /// `index`) was removed from `room.players`.
    fn on_player_left(
        room: &mut Room<Self>,
        departed: &Player<Self::Role>,
        index: usize,
    ) -> Outbox<Self>;

    /// Re-keys board state that refers to `old` after a seat takeover.
    fn rebind(_room: &mut Room<Self>, _old: ConnectionId, _new: ConnectionId) {}

    /// Whether a finished round is followed by another one automatically.
    fn auto_continues() -> bool {
        false
    }

    /// Who starts the upcoming round, for `game-reset`.
    fn next_starter(_room: &Room<Self>) -> Option<String> {
        None
    }

    // -- automatic play --------------------------------------------------

    /// Period of the automatic player, or `None` if the game has none.
    fn autoplay_period(_config: &Self::Config) -> Option<Duration> {
        None
    }

    /// Whether `conn` may switch automatic play on or off.
    ///
    /// # Errors
    /// The reason why not.
    fn may_toggle_autoplay(_room: &Room<Self>, _conn: ConnectionId) -> Result<(), MoveError> {
        Err(MoveError::Unsupported)
    }

    /// The seat automatic play acts for. Automatic play stops when that
    /// seat leaves.
    fn autoplay_actor(_room: &Room<Self>) -> Option<ConnectionId> {
        None
    }

    /// The next automatic move, or `None` when there is nothing left to
    /// play.
    fn autoplay_move(_room: &Room<Self>) -> Option<(ConnectionId, Self::Move)> {
        None
    }

    // -- optional commands -----------------------------------------------

    /// Whether `conn` may start the next round.
    ///
    /// # Errors
    /// The reason why not.
    fn may_reset(_room: &Room<Self>, _conn: ConnectionId) -> Result<(), MoveError> {
        Ok(())
    }

    /// Passes the turn.
    ///
    /// # Errors
    /// [`MoveError::Unsupported`] unless the game has turns to skip.
    fn skip_turn(_room: &mut Room<Self>, _conn: ConnectionId) -> Result<Outbox<Self>, MoveError> {
        Err(MoveError::Unsupported)
    }

    /// Suggests a move, privately.
    ///
    /// # Errors
    /// [`MoveError::Unsupported`] unless the game offers hints.
    fn hint(_room: &Room<Self>, _conn: ConnectionId) -> Result<Outbox<Self>, MoveError> {
        Err(MoveError::Unsupported)
    }
}
