//! Connection identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT: AtomicU64 = AtomicU64::new(1);

/// Identifier for one live socket.
///
/// Ids come from a process-wide counter starting at 1 and are never
/// reused, so sorting them recovers accept order. Everything
/// connection-scoped (room seats, stats, registry bindings) is keyed by
/// this value.
///
/// On the wire it is a plain number, the `connectionId` a browser is
/// greeted with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id. Tests and mock transports use this; real sockets
    /// get theirs from [`ConnectionId::next`].
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Hands out the next unused id.
    pub fn next() -> Self {
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<ConnectionId> for u64 {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}
