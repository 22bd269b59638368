//! `tokio-tungstenite` backed transport.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Largest inbound data frame accepted unless configured otherwise.
///
/// Every client event fits comfortably in a few hundred bytes; chat text
/// is the only free-form field.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Listens on a TCP port and upgrades each client to a WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_frame_bytes: usize,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "listening for websocket clients");
        Ok(Self {
            listener,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        })
    }

    /// Caps the size of inbound data frames on connections accepted from
    /// now on. Larger frames are reported as
    /// [`TransportError::FrameTooLarge`] and dropped.
    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// The bound address. After binding port 0 this carries the port the
    /// OS picked.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(|e| TransportError::Handshake {
                peer,
                reason: e.to_string(),
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "websocket upgraded");

        // Reader and writer halves lock independently.
        let (writer, reader) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            max_frame_bytes: self.max_frame_bytes,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// One upgraded client socket.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_frame_bytes: usize,
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn check_len(&self, len: usize) -> Result<(), TransportError> {
        if len > self.max_frame_bytes {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }
        Ok(())
    }

    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = std::str::from_utf8(data)
            .map(Message::text)
            .unwrap_or_else(|_| Message::binary(data.to_vec()));
        self.write(msg).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut reader = self.reader.lock().await;
        while let Some(item) = reader.next().await {
            let msg = item.map_err(|e| {
                TransportError::ReceiveFailed(io::Error::new(io::ErrorKind::ConnectionReset, e))
            })?;
            let data = match msg {
                Message::Text(text) => text.as_bytes().to_vec(),
                Message::Binary(bytes) => bytes.to_vec(),
                Message::Close(_) => return Ok(None),
                // Pings are answered by tungstenite.
                _ => continue,
            };
            self.check_len(data.len())?;
            return Ok(Some(data));
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
