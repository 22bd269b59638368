//! `HangoutServer` builder and server loop.
//!
//! This is the entry point for running the hangout server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use hangout_games::{Bingo, DotsAndBoxes, TicTacToe, config_from_options};
use hangout_protocol::{ConnectionId, GameKind, JsonCodec, RoomCode};
use hangout_room::{
    Action, GameEngine, JoinOutcome, PlayerSender, RoomConfig, RoomError, RoomHandle, RoomStore,
};
use hangout_session::{Binding, ConnectionRegistry, StatsTracker};
use hangout_transport::{DEFAULT_MAX_FRAME_BYTES, Transport, WebSocketTransport};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::HangoutError;
use crate::handler::handle_connection;

/// Address the binary listens on when `HANGOUT_BIND` is unset.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Server-wide settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed and
    /// cleaned up like a disconnect. Heartbeats count as traffic.
    pub client_idle_timeout: Duration,

    /// Inbound frames larger than this are refused with an `error` event.
    pub max_frame_bytes: usize,

    /// Rooms with no activity for this long are shut down by the sweep.
    pub idle_room_timeout: Duration,

    /// How often the idle-room sweep runs.
    pub sweep_interval: Duration,

    /// Settings handed to every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            client_idle_timeout: Duration::from_secs(60),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            idle_room_timeout: Duration::from_secs(2 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
            room: RoomConfig::default(),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Each lock is
/// held only for bookkeeping and released before a room is awaited.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
    /// Per-connection records, shared with every room.
    pub(crate) stats: StatsTracker,
    tic_tac_toe: Mutex<RoomStore<TicTacToe>>,
    bingo: Mutex<RoomStore<Bingo>>,
    dots: Mutex<RoomStore<DotsAndBoxes>>,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        let stats = StatsTracker::new();
        Self {
            registry: Mutex::new(ConnectionRegistry::new()),
            codec: JsonCodec,
            tic_tac_toe: Mutex::new(RoomStore::new(config.room.clone(), stats.clone())),
            bingo: Mutex::new(RoomStore::new(config.room.clone(), stats.clone())),
            dots: Mutex::new(RoomStore::new(config.room.clone(), stats.clone())),
            stats,
            config,
        }
    }

    /// Seats `conn` in the room `code` of the given game, creating the room
    /// with `options` if it does not exist yet.
    pub(crate) async fn join(
        &self,
        game: GameKind,
        code: &RoomCode,
        conn: ConnectionId,
        display_name: &str,
        options: Option<&Value>,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        match game {
            GameKind::TicTacToe => {
                join_room(&self.tic_tac_toe, code, conn, display_name, options, sender).await
            }
            GameKind::Bingo => join_room(&self.bingo, code, conn, display_name, options, sender).await,
            GameKind::DotsAndBoxes => {
                join_room(&self.dots, code, conn, display_name, options, sender).await
            }
        }
    }

    /// Runs the disconnect path for `conn` in the room it is bound to.
    pub(crate) async fn leave(&self, binding: &Binding, conn: ConnectionId) -> Result<(), RoomError> {
        match binding.game {
            GameKind::TicTacToe => room(&self.tic_tac_toe, &binding.room).await?.leave(conn).await,
            GameKind::Bingo => room(&self.bingo, &binding.room).await?.leave(conn).await,
            GameKind::DotsAndBoxes => room(&self.dots, &binding.room).await?.leave(conn).await,
        }
    }

    /// Forwards a member's command to its room.
    pub(crate) async fn act(
        &self,
        binding: &Binding,
        conn: ConnectionId,
        action: Action,
    ) -> Result<(), RoomError> {
        match binding.game {
            GameKind::TicTacToe => {
                room(&self.tic_tac_toe, &binding.room).await?.act(conn, action).await
            }
            GameKind::Bingo => room(&self.bingo, &binding.room).await?.act(conn, action).await,
            GameKind::DotsAndBoxes => room(&self.dots, &binding.room).await?.act(conn, action).await,
        }
    }

    /// Shuts down rooms idle for longer than the configured timeout.
    /// Returns how many were closed.
    pub(crate) async fn sweep_idle_rooms(&self) -> usize {
        let max_idle = self.config.idle_room_timeout;
        sweep(&self.tic_tac_toe, max_idle).await
            + sweep(&self.bingo, max_idle).await
            + sweep(&self.dots, max_idle).await
    }

    /// Live rooms across all games.
    pub(crate) async fn room_count(&self) -> usize {
        self.tic_tac_toe.lock().await.room_count()
            + self.bingo.lock().await.room_count()
            + self.dots.lock().await.room_count()
    }
}

/// Closes one store's idle rooms. The store is locked only to list and
/// to forget rooms, never while a room is answering.
async fn sweep<E: GameEngine>(store: &Mutex<RoomStore<E>>, max_idle: Duration) -> usize {
    let handles = store.lock().await.handles();
    let closed = RoomStore::close_idle(handles, max_idle).await;
    store.lock().await.forget(&closed);
    closed.len()
}

async fn room<E: GameEngine>(
    store: &Mutex<RoomStore<E>>,
    code: &RoomCode,
) -> Result<RoomHandle<E>, RoomError> {
    store
        .lock()
        .await
        .get(code)
        .ok_or_else(|| RoomError::NotFound(code.clone()))
}

async fn join_room<E: GameEngine>(
    store: &Mutex<RoomStore<E>>,
    code: &RoomCode,
    conn: ConnectionId,
    display_name: &str,
    options: Option<&Value>,
    sender: PlayerSender,
) -> Result<JoinOutcome, RoomError> {
    let handle = store
        .lock()
        .await
        .get_or_create(code, config_from_options::<E>(options));
    match handle.join(conn, display_name, sender.clone()).await {
        // The room stopped between lookup and join (reaped or torn down).
        // The store notices the closed handle and starts a fresh one.
        Err(RoomError::Unavailable(_)) => {
            let handle = store
                .lock()
                .await
                .get_or_create(code, config_from_options::<E>(options));
            handle.join(conn, display_name, sender).await
        }
        other => other,
    }
}

/// Builder for configuring and starting a hangout server.
///
/// # Example
///
/// ```rust,no_run
/// use hangout::prelude::*;
///
/// # async fn start() -> Result<(), HangoutError> {
/// let server = HangoutServer::builder()
///     .bind("127.0.0.1:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HangoutServerBuilder {
    config: ServerConfig,
}

impl HangoutServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn client_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.client_idle_timeout = timeout;
        self
    }

    /// Sets the largest inbound frame a client may send.
    pub fn max_frame_bytes(mut self, max: usize) -> Self {
        self.config.max_frame_bytes = max;
        self
    }

    /// Sets how long a room may sit without activity before the sweep
    /// closes it.
    pub fn idle_room_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_room_timeout = timeout;
        self
    }

    /// Sets how often the idle-room sweep runs.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Sets the settings every room is created with.
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and prepares the shared state.
    ///
    /// # Errors
    /// Returns [`HangoutError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<HangoutServer, HangoutError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_max_frame_bytes(self.config.max_frame_bytes);
        let state = Arc::new(ServerState::new(self.config));
        Ok(HangoutServer { transport, state })
    }
}

impl Default for HangoutServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound hangout server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HangoutServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl HangoutServer {
    /// Creates a new builder.
    pub fn builder() -> HangoutServerBuilder {
        HangoutServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Starts the idle-room sweep, then accepts incoming connections and
    /// spawns a handler task for each. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), HangoutError> {
        tracing::info!(addr = %self.state.config.bind_addr, "hangout server running");
        tokio::spawn(sweep_loop(Arc::clone(&self.state)));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn sweep_loop(state: Arc<ServerState>) {
    let period = state.config.sweep_interval.max(Duration::from_millis(100));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let closed = state.sweep_idle_rooms().await;
        if closed > 0 {
            let rooms = state.room_count().await;
            tracing::info!(closed, rooms, "idle rooms swept");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangout_room::Outbound;
    use tokio::sync::mpsc;

    fn code(raw: &str) -> RoomCode {
        RoomCode::parse(raw).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.client_idle_timeout, Duration::from_secs(60));
        assert_eq!(config.max_frame_bytes, 16 * 1024);
        assert_eq!(config.idle_room_timeout, Duration::from_secs(7200));
        assert_eq!(config.room.reap_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_overrides() {
        let builder = HangoutServerBuilder::new()
            .bind("127.0.0.1:0")
            .client_idle_timeout(Duration::from_secs(5))
            .idle_room_timeout(Duration::from_secs(10))
            .sweep_interval(Duration::from_secs(1))
            .max_frame_bytes(512);
        assert_eq!(builder.config.bind_addr, "127.0.0.1:0");
        assert_eq!(builder.config.max_frame_bytes, 512);
        assert_eq!(builder.config.client_idle_timeout, Duration::from_secs(5));
        assert_eq!(builder.config.idle_room_timeout, Duration::from_secs(10));
        assert_eq!(builder.config.sweep_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_rooms_are_separate_per_game() {
        let state = ServerState::new(ServerConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel::<Outbound>();
        let lobby = code("lobby");

        state
            .join(GameKind::TicTacToe, &lobby, ConnectionId::new(1), "Ana", None, tx.clone())
            .await
            .unwrap();
        state
            .join(GameKind::Bingo, &lobby, ConnectionId::new(2), "Bo", None, tx)
            .await
            .unwrap();

        assert_eq!(state.room_count().await, 2);
    }

    #[tokio::test]
    async fn test_act_on_missing_room_is_not_found() {
        let state = ServerState::new(ServerConfig::default());
        let binding = Binding {
            room: code("ghost"),
            game: GameKind::DotsAndBoxes,
            display_name: "Ana".into(),
        };
        let err = state
            .act(&binding, ConnectionId::new(1), Action::SkipTurn)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_closes_idle_rooms() {
        let config = ServerConfig {
            idle_room_timeout: Duration::ZERO,
            ..ServerConfig::default()
        };
        let state = ServerState::new(config);
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
        state
            .join(GameKind::TicTacToe, &code("old"), ConnectionId::new(1), "Ana", None, tx)
            .await
            .unwrap();

        // lastActivityAt has millisecond resolution.
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(state.sweep_idle_rooms().await, 1);

        let mut evicted = false;
        while let Some(out) = rx.recv().await {
            if matches!(out, Outbound::Evicted { .. }) {
                evicted = true;
                break;
            }
        }
        assert!(evicted);
    }
}
