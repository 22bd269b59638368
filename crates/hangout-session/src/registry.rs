//! The connection registry: which sockets are live and where they sit.
//!
//! Every inbound room command goes through [`ConnectionRegistry::resolve`]
//! first. That is the only place a command is tied to a room, so a client
//! can never act on a room it has not joined, whatever room id it sends.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap` with no locking of its own.
//! The server owns exactly one behind a `tokio::sync::Mutex` and never holds
//! that lock across a call into a room.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hangout_protocol::{ConnectionId, GameKind, RoomCode};

use crate::SessionError;

/// Where a connection is seated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The room the connection joined.
    pub room: RoomCode,
    /// The game that room plays; picks which room store to talk to.
    pub game: GameKind,
    /// Display name the connection joined with.
    pub display_name: String,
}

impl Binding {
    /// Returns `true` if this binding points at `room` of kind `game`.
    pub fn is(&self, room: &RoomCode, game: GameKind) -> bool {
        self.room == *room && self.game == game
    }
}

#[derive(Debug)]
struct Entry {
    connected_at: Instant,
    binding: Option<Binding>,
}

/// Tracks every live connection and its optional room binding.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ bind() ──→ unbind() / bind() elsewhere ──→ unregister()
///    [live]      [seated]           [live]                    [gone]
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly accepted connection.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if the id is already live.
    pub fn register(&mut self, conn: ConnectionId) -> Result<(), SessionError> {
        if self.connections.contains_key(&conn) {
            return Err(SessionError::AlreadyRegistered(conn));
        }
        self.connections.insert(
            conn,
            Entry {
                connected_at: Instant::now(),
                binding: None,
            },
        );
        tracing::debug!(%conn, live = self.connections.len(), "connection registered");
        Ok(())
    }

    /// Forgets a connection and hands back its binding, if it had one, so
    /// the caller can run the room's disconnect path.
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<Binding> {
        let entry = self.connections.remove(&conn)?;
        tracing::debug!(%conn, live = self.connections.len(), "connection unregistered");
        entry.binding
    }

    /// Seats a connection in a room, returning the binding it replaced.
    ///
    /// # Errors
    /// Returns [`SessionError::NotRegistered`] for unknown connections.
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        room: RoomCode,
        game: GameKind,
        display_name: impl Into<String>,
    ) -> Result<Option<Binding>, SessionError> {
        let entry = self
            .connections
            .get_mut(&conn)
            .ok_or(SessionError::NotRegistered(conn))?;
        let binding = Binding {
            room,
            game,
            display_name: display_name.into(),
        };
        tracing::debug!(%conn, room = %binding.room, game = %binding.game, "connection bound");
        Ok(entry.binding.replace(binding))
    }

    /// Clears a connection's binding.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Binding> {
        self.connections.get_mut(&conn)?.binding.take()
    }

    /// Clears the binding only if it still points at `room`/`game`.
    ///
    /// Used when a room evicts a member: by the time the eviction reaches
    /// the connection it may already have moved on to another room.
    pub fn unbind_if(&mut self, conn: ConnectionId, room: &RoomCode, game: GameKind) -> bool {
        match self.connections.get_mut(&conn) {
            Some(entry) if entry.binding.as_ref().is_some_and(|b| b.is(room, game)) => {
                entry.binding = None;
                true
            }
            _ => false,
        }
    }

    /// Where a connection is seated. `None` is the normal "not joined"
    /// case, not an error.
    pub fn lookup(&self, conn: ConnectionId) -> Option<&Binding> {
        self.connections.get(&conn)?.binding.as_ref()
    }

    /// Resolves a room command to the sender's binding.
    ///
    /// # Errors
    /// - [`SessionError::NotJoined`]: the connection is not in any room
    /// - [`SessionError::WrongRoom`]: the command names a different room
    pub fn resolve(&self, conn: ConnectionId, requested: &RoomCode) -> Result<&Binding, SessionError> {
        let binding = self.lookup(conn).ok_or(SessionError::NotJoined(conn))?;
        if binding.room != *requested {
            return Err(SessionError::WrongRoom {
                conn,
                bound: binding.room.clone(),
                requested: requested.clone(),
            });
        }
        Ok(binding)
    }

    /// Every connection bound to the given room.
    pub fn members(&self, room: &RoomCode, game: GameKind) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, entry)| entry.binding.as_ref().is_some_and(|b| b.is(room, game)))
            .map(|(conn, _)| *conn)
            .collect();
        members.sort();
        members
    }

    /// How long a connection has been live.
    pub fn connected_for(&self, conn: ConnectionId) -> Option<Duration> {
        self.connections.get(&conn).map(|e| e.connected_at.elapsed())
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is live.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of live connections currently seated in a room.
    pub fn bound_count(&self) -> usize {
        self.connections
            .values()
            .filter(|e| e.binding.is_some())
            .count()
    }
}
