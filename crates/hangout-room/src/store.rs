//! Room store: creates, tracks, and finds rooms of one game.

use std::collections::HashMap;
use std::time::Duration;

use hangout_protocol::RoomCode;
use hangout_session::StatsTracker;

use crate::room::spawn_room;
use crate::{GameEngine, RoomConfig, RoomHandle, RoomInfo};

/// Maps room codes to running room actors for one game.
///
/// Codes arrive already normalized ([`RoomCode`] upper-cases them), so
/// `"abc"` and `"ABC"` always resolve to the same room. The server keeps
/// one store per game behind a mutex; creation happens while that lock is
/// held, so two concurrent joins can never spawn two actors for one code.
///
/// Rooms remove themselves: when an actor stops (reaped, terminated, shut
/// down) its handle reports closed and the store drops it on next access.
pub struct RoomStore<E: GameEngine> {
    rooms: HashMap<RoomCode, RoomHandle<E>>,
    settings: RoomConfig,
    stats: StatsTracker,
}

impl<E: GameEngine> RoomStore<E> {
    /// Creates an empty store. Every room it spawns shares `stats`.
    pub fn new(settings: RoomConfig, stats: StatsTracker) -> Self {
        Self {
            rooms: HashMap::new(),
            settings,
            stats,
        }
    }

    /// Returns the live room for `code`, spawning it with `config` if there
    /// is none. `config` is ignored for existing rooms.
    pub fn get_or_create(&mut self, code: &RoomCode, config: E::Config) -> RoomHandle<E> {
        if let Some(handle) = self.rooms.get(code) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        let handle = spawn_room::<E>(code.clone(), config, self.settings.clone(), self.stats.clone());
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room_id = %code, game = %E::KIND, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Returns the live room for `code`, if any.
    pub fn get(&self, code: &RoomCode) -> Option<RoomHandle<E>> {
        self.rooms.get(code).filter(|h| !h.is_closed()).cloned()
    }

    /// Forgets a room. The actor keeps running until told otherwise.
    pub fn remove(&mut self, code: &RoomCode) -> Option<RoomHandle<E>> {
        self.rooms.remove(code)
    }

    /// Drops handles of rooms whose actor has stopped.
    pub fn prune(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        before - self.rooms.len()
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.values().filter(|h| !h.is_closed()).count()
    }

    /// Codes of live rooms, sorted.
    pub fn codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, h)| !h.is_closed())
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }

    /// Returns cloned handles to all live rooms.
    ///
    /// Useful when callers need to perform async operations on rooms
    /// without holding the store lock.
    pub fn handles(&self) -> Vec<RoomHandle<E>> {
        self.rooms.values().filter(|h| !h.is_closed()).cloned().collect()
    }

    /// Queries every live room for its info. Rooms that fail to respond
    /// (e.g. shutting down) are skipped.
    pub async fn list(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.handles() {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.code.cmp(&b.code));
        infos
    }

    /// Shuts down the rooms among `handles` idle for longer than
    /// `max_idle` and returns them.
    ///
    /// Works on handles, not the store, so the store lock can be released
    /// while rooms answer. Pass the result to [`RoomStore::forget`].
    pub async fn close_idle(handles: Vec<RoomHandle<E>>, max_idle: Duration) -> Vec<RoomHandle<E>> {
        let max_idle_ms = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        let mut closed = Vec::new();
        for handle in handles {
            let Ok(info) = handle.info().await else { continue };
            if info.idle_for_ms() > max_idle_ms {
                tracing::info!(
                    room_id = %info.code,
                    idle_ms = info.idle_for_ms(),
                    players = info.player_count,
                    "closing idle room"
                );
                let _ = handle.shutdown().await;
                closed.push(handle);
            }
        }
        closed
    }

    /// Drops `closed` rooms and any other stopped ones. A room spawned
    /// under the same code in the meantime stays.
    pub fn forget(&mut self, closed: &[RoomHandle<E>]) -> usize {
        let before = self.rooms.len();
        self.rooms
            .retain(|_, handle| !handle.is_closed() && !closed.iter().any(|c| c.same_room(handle)));
        before - self.rooms.len()
    }
}
