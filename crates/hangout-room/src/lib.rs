//! Room lifecycle management for hangout.
//!
//! Each room runs as an isolated Tokio task (actor model) with its own
//! board, player list, chat log and timers. All mutations of one room go
//! through its mailbox, so they are applied, and broadcast, in a single
//! linear order. Different rooms run in parallel.
//!
//! # Key types
//!
//! - [`GameEngine`]: the trait each game implements (pure rules)
//! - [`Room`]: the aggregate an engine works on
//! - [`RoomSession`]: the controller that runs the shared room rules and
//!   returns [`Effect`]s
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomStore`]: finds or spawns rooms by code
//! - [`RoomSnapshot`]: the sanitized `game-state` view

mod bounded;
mod broadcast;
mod config;
mod error;
mod logic;
mod room;
mod session;
mod state;
mod store;

pub use bounded::BoundedLog;
pub use broadcast::{
    EvictReason, Notice, Outbound, PlayerSender, PlayerView, RoomSnapshot, SnapshotOf,
};
pub use config::{RoomConfig, RoomLimits, RoomStatus};
pub use error::{MoveError, RoomError};
pub use logic::{GameEngine, Outbox};
pub use room::{JoinOutcome, RoomHandle, RoomInfo, spawn_room};
pub use session::{Action, Effect, Joined, RoomSession, TimerOp};
pub use state::{EndReason, Player, Room, RoundEnd, RoundSummary};
pub use store::RoomStore;
