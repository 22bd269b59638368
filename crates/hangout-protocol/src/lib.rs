//! Wire protocol for the hangout server.
//!
//! This crate defines the "language" that browsers and the server speak:
//!
//! - **Identity** ([`RoomCode`], [`GameKind`], [`ConnectionId`]): which
//!   room, which game, which socket.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`Envelope`]): every
//!   command a client can send and every notification the server emits.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong at this layer.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (game state). It knows nothing about rules or turns; it only makes
//! sure that anything reaching a game engine already has the right shape.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Room (validated command)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use hangout_transport::ConnectionId;
pub use types::{
    ChatMessage, ClientEvent, Envelope, GameKind, LineRef, MoveRequest, Orientation, Recipient,
    RoomCode, ServerEvent, now_millis,
};
