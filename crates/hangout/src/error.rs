//! Unified error type for the hangout server.

use hangout_protocol::ProtocolError;
use hangout_room::RoomError;
use hangout_session::SessionError;
use hangout_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Connection handlers return this, so `?` works across the transport,
/// protocol, session and room layers. None of these ever reach a client
/// as-is: rejections are turned into private events before that.
#[derive(Debug, thiserror::Error)]
pub enum HangoutError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad room code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry error (double registration, unknown connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, gone, rule violation).
    #[error(transparent)]
    Room(#[from] RoomError),
}
