//! Error types for the room layer.
//!
//! Two levels: [`MoveError`] is a game rule saying no (sent back as a
//! private `move-error`), while [`RoomError`] covers everything around the
//! game such as membership, capacity and a dead room actor.

use hangout_protocol::{ConnectionId, RoomCode};

/// A game engine rejected a command.
///
/// Never fatal and never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// No round is in progress.
    #[error("the game is not in progress")]
    NotActive,

    /// Someone else holds the turn.
    #[error("it is not your turn")]
    NotYourTurn,

    /// Tic-tac-toe: the cell already holds a mark.
    #[error("that cell is already taken")]
    CellOccupied,

    /// The cell, line or number does not exist on this board.
    #[error("that move is out of range")]
    OutOfRange,

    /// Bingo: the number was called earlier this round.
    #[error("number {0} has already been called")]
    AlreadyCalled(u32),

    /// Bingo: only the caller may call numbers or steer the round.
    #[error("only the caller can do that")]
    NotCaller,

    /// Dots-and-boxes: the line was drawn earlier this round.
    #[error("that line is already drawn")]
    LineTaken,

    /// The sender holds no role in the current round.
    #[error("you are not playing in this game")]
    NotAPlayer,

    /// The command exists, but not for this game.
    #[error("this game does not support that command")]
    Unsupported,

    /// The sender may not do this right now.
    #[error("you are not allowed to do that")]
    NotPermitted,
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection is already seated in this room.
    #[error("connection {0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomCode),

    /// The connection is not seated in this room.
    #[error("connection {0} not in room {1}")]
    NotInRoom(ConnectionId, RoomCode),

    /// Display name empty or too long.
    #[error("invalid display name: {0}")]
    InvalidName(String),

    /// Chat line empty or too long.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The room is in a state that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room's actor has shut down or its mailbox is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// A game rule rejected the command.
    #[error(transparent)]
    Move(#[from] MoveError),
}

impl RoomError {
    /// Returns `true` for rejections that should be reported as
    /// `move-error` rather than a generic `error`.
    pub fn is_move_error(&self) -> bool {
        matches!(self, Self::Move(_))
    }
}
