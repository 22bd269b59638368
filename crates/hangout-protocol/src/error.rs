//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, the problem is the shape of a message, not the rules of
//! a game or the health of a socket.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `event` name, missing
    /// fields, or a field with the wrong type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A room code was empty, too long, or used characters outside
    /// `[A-Za-z0-9_-]`.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),

    /// The message decoded fine but makes no sense at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
