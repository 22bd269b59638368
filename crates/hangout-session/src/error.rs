//! Error types for the session layer.

use hangout_protocol::{ConnectionId, RoomCode};

/// Errors raised by the connection registry.
///
/// A lookup miss is not an error (an unbound connection is the normal
/// "not joined yet" case); these cover bookkeeping misuse instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection was registered twice.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The connection is unknown (never registered, or already gone).
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),

    /// The connection sent a room command without joining a room first.
    #[error("connection {0} has not joined a room")]
    NotJoined(ConnectionId),

    /// The connection addressed a room other than the one it is bound to.
    #[error("connection {conn} is in room {bound}, not {requested}")]
    WrongRoom {
        /// Offending connection.
        conn: ConnectionId,
        /// Room the connection is bound to.
        bound: RoomCode,
        /// Room named in the command.
        requested: RoomCode,
    },
}
