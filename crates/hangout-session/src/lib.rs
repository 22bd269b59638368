//! Connection-scoped bookkeeping for the hangout server.
//!
//! Two small services live here, both keyed by [`ConnectionId`]:
//!
//! - [`ConnectionRegistry`]: which sockets are live and which room (and
//!   game) each one is bound to. Consulted on every inbound event to find
//!   the room it targets.
//! - [`StatsTracker`]: running win/loss/tie counters and streaks, shared
//!   by every room actor and attached to room snapshots.
//!
//! Neither knows any game rules.
//!
//! [`ConnectionId`]: hangout_protocol::ConnectionId

mod error;
mod registry;
mod stats;

pub use error::SessionError;
pub use registry::{Binding, ConnectionRegistry};
pub use stats::{Outcome, StatsRecord, StatsTracker};
