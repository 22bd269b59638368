//! Socket layer for the hangout server.
//!
//! Browsers reach the server over WebSocket. Everything above this crate
//! sees two traits and an id:
//!
//! - [`Transport`] hands out accepted connections.
//! - [`Connection`] moves whole frames in and out of one socket.
//! - [`ConnectionId`] names a socket for as long as the process runs.
//!
//! The `websocket` feature (on by default) provides [`WebSocketTransport`]
//! on top of `tokio-tungstenite`.

#![allow(async_fn_in_trait)]

mod error;
mod id;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use id::ConnectionId;
#[cfg(feature = "websocket")]
pub use websocket::{DEFAULT_MAX_FRAME_BYTES, WebSocketConnection, WebSocketTransport};

/// Source of new connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its handshake.
    ///
    /// A failed handshake is reported as an error for that one client;
    /// the transport itself keeps accepting.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new clients. Live connections are not touched.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One client socket, frame in and frame out.
///
/// `send` and `recv` take `&self` so a handler can await the next inbound
/// frame in one `select!` branch while pushing room broadcasts out through
/// another.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame. Valid UTF-8 goes out as a text frame, anything
    /// else as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next data frame, skipping control frames.
    ///
    /// `Ok(None)` means the peer closed the socket.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a close frame.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
