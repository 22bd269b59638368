//! # Hangout
//!
//! WebSocket server for browser party games with room chat.
//!
//! Players pick a room code and a game (tic-tac-toe, bingo or
//! dots-and-boxes). Every room runs as its own actor: it validates each
//! command against the game rules, applies it, and broadcasts the result
//! to every member in one linear order. The server layer here only accepts
//! sockets, tracks which room each connection sits in, and routes events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hangout::prelude::*;
//!
//! # async fn start() -> Result<(), HangoutError> {
//! let server = HangoutServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::HangoutError;
pub use server::{DEFAULT_BIND, HangoutServer, HangoutServerBuilder, ServerConfig};

/// Everything needed to start a server or talk to one in tests.
pub mod prelude {
    pub use crate::{DEFAULT_BIND, HangoutError, HangoutServer, HangoutServerBuilder, ServerConfig};
    pub use hangout_games::{Bingo, BingoConfig, CardSize, DotsAndBoxes, DotsConfig, GridSize, TicTacToe};
    pub use hangout_protocol::{
        ClientEvent, Codec, ConnectionId, Envelope, GameKind, JsonCodec, LineRef, Orientation,
        RoomCode, ServerEvent,
    };
    pub use hangout_room::{RoomConfig, RoomError};
}
