/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The TCP connection was accepted but the WebSocket upgrade failed.
    #[error("websocket handshake with {peer} failed: {reason}")]
    Handshake {
        /// Remote address of the peer.
        peer: std::net::SocketAddr,
        /// What the upgrade rejected.
        reason: String,
    },

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The peer sent a data frame over the configured size cap.
    ///
    /// The frame is dropped; the socket stays open.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
