//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model": no shared mutable
//! state, just message passing. Because the actor handles one command at a
//! time, every mutation of a room is applied, and its events are sent, in
//! one linear order.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use hangout_protocol::{
    ConnectionId, GameKind, JsonCodec, Recipient, RoomCode, ServerEvent, now_millis,
};
use hangout_session::StatsTracker;
use hangout_timer::{Countdown, Repeater};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    Action, Effect, EvictReason, GameEngine, Notice, Outbound, PlayerSender, Room, RoomConfig,
    RoomError, RoomSession, RoomStatus, TimerOp,
};

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is a "reply channel": the caller
/// sends a command and waits for the response on that channel.
pub(crate) enum RoomCommand {
    /// Seat a connection.
    Join {
        conn: ConnectionId,
        display_name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinOutcome, RoomError>>,
    },

    /// Remove a connection.
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Run a member's command. Rejections are also reported to the member
    /// as a private notice by the actor itself.
    Act {
        conn: ConnectionId,
        action: Action,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Close the room now.
    Shutdown,
}

/// How a join went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// `true` when the join took over a seat held under the same name.
    pub reconnected: bool,
    /// The connection that lost its seat, if any.
    pub replaced: Option<ConnectionId>,
}

/// A snapshot of room metadata (not the board itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub game: GameKind,
    pub status: RoomStatus,
    pub player_count: usize,
    pub max_players: usize,
    pub round_count: u32,
    pub created_at: u64,
    pub last_activity_at: u64,
}

impl RoomInfo {
    /// Milliseconds since anything happened in the room.
    pub fn idle_for_ms(&self) -> u64 {
        now_millis().saturating_sub(self.last_activity_at)
    }
}

/// Handle to a running room actor. Used to send commands to it.
///
/// This is cheap to clone; it's just an `mpsc::Sender` wrapper.
/// The [`RoomStore`](crate::RoomStore) holds one of these per room.
pub struct RoomHandle<E: GameEngine> {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
    _engine: PhantomData<fn() -> E>,
}

impl<E: GameEngine> Clone for RoomHandle<E> {
    fn clone(&self) -> Self {
        Self {
            code: self.code.clone(),
            sender: self.sender.clone(),
            _engine: PhantomData,
        }
    }
}

impl<E: GameEngine> RoomHandle<E> {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether both handles talk to the same actor.
    pub fn same_room(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    /// Seats a connection; `sender` receives everything the room sends it.
    pub async fn join(
        &self,
        conn: ConnectionId,
        display_name: &str,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                conn,
                display_name: display_name.to_string(),
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a connection.
    pub async fn leave(&self, conn: ConnectionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave { conn, reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Runs a member's command and waits until it has been applied.
    pub async fn act(&self, conn: ConnectionId, action: Action) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Act {
                conn,
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to close. Members are evicted.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<E: GameEngine> {
    session: RoomSession<E>,
    /// Per-member outbound channels.
    senders: HashMap<ConnectionId, PlayerSender>,
    codec: JsonCodec,
    /// Sequence number of the last event sent.
    seq: u64,
    receiver: mpsc::Receiver<RoomCommand>,
    next_round: Countdown,
    reap: Countdown,
    teardown: Countdown,
    autoplay: Repeater,
}

impl<E: GameEngine> RoomActor<E> {
    fn code(&self) -> &RoomCode {
        &self.session.room().code
    }

    /// Runs the actor loop until the room closes.
    async fn run(mut self) {
        info!(room_id = %self.code(), game = %E::KIND, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                () = self.next_round.fired() => {
                    let fx = self.session.auto_continue();
                    self.apply(fx);
                }
                _ = self.autoplay.next_fire() => {
                    let fx = self.session.autoplay_tick();
                    self.apply(fx);
                }
                () = self.reap.fired() => {
                    if self.session.room().players.is_empty() {
                        info!(room_id = %self.code(), "empty room reaped");
                        break;
                    }
                }
                () = self.teardown.fired() => {
                    info!(room_id = %self.code(), "room torn down");
                    self.evict_all();
                    break;
                }
            }
        }

        info!(room_id = %self.code(), "room actor stopped");
    }

    /// Handles one command. Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                conn,
                display_name,
                sender,
                reply,
            } => {
                let result = match self.session.join(conn, &display_name) {
                    Ok(joined) => {
                        self.senders.insert(conn, sender);
                        self.apply(joined.effects);
                        Ok(JoinOutcome {
                            reconnected: joined.reconnected,
                            replaced: joined.replaced,
                        })
                    }
                    Err(err) => {
                        debug!(room_id = %self.code(), %conn, %err, "join rejected");
                        Err(err)
                    }
                };
                let _ = reply.send(result);
            }
            RoomCommand::Leave { conn, reply } => {
                let result = self.session.leave(conn).map(|fx| {
                    self.senders.remove(&conn);
                    self.apply(fx);
                });
                let _ = reply.send(result);
            }
            RoomCommand::Act { conn, action, reply } => {
                let result = match self.session.act(conn, action) {
                    Ok(fx) => {
                        self.apply(fx);
                        Ok(())
                    }
                    Err(err) => {
                        debug!(room_id = %self.code(), %conn, %err, "command rejected");
                        self.reject(conn, &err);
                        Err(err)
                    }
                };
                let _ = reply.send(result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                info!(room_id = %self.code(), "room shutting down");
                self.evict_all();
                return false;
            }
        }
        true
    }

    /// Carries out the controller's effects, in order.
    fn apply(&mut self, effects: Vec<Effect<E>>) {
        for effect in effects {
            match effect {
                Effect::Send(to, notice) => self.deliver(to, &notice),
                Effect::Evict(conn) => self.evict(conn, EvictReason::Replaced),
                Effect::Timer(op) => self.schedule(op),
            }
        }
    }

    fn schedule(&mut self, op: TimerOp) {
        match op {
            TimerOp::ScheduleNextRound(after) => self.next_round.arm(after),
            TimerOp::CancelNextRound => self.next_round.cancel(),
            TimerOp::StartAutoPlay(period) => {
                self.autoplay.set_period(period);
                self.autoplay.start();
            }
            TimerOp::StopAutoPlay => self.autoplay.stop(),
            TimerOp::ScheduleReap(after) => self.reap.arm(after),
            TimerOp::CancelReap => self.reap.cancel(),
            TimerOp::ScheduleTeardown(after) => self.teardown.arm(after),
        }
    }

    /// Encodes a notice once and sends it to every addressed member.
    fn deliver(&mut self, to: Recipient, notice: &Notice<E>) {
        self.seq += 1;
        let frame: Arc<[u8]> = match notice.encode(&self.codec, self.seq, now_millis()) {
            Ok(bytes) => bytes.into(),
            Err(err) => {
                warn!(room_id = %self.code(), %err, "failed to encode room event");
                return;
            }
        };
        for conn in self.session.room().conns() {
            if !to.includes(conn) {
                continue;
            }
            if let Some(sender) = self.senders.get(&conn) {
                // A closed receiver means the connection is going away;
                // its disconnect path will remove it from the room.
                let _ = sender.send(Outbound::Frame(Arc::clone(&frame)));
            }
        }
    }

    /// Reports a rejected command to its sender only.
    fn reject(&mut self, conn: ConnectionId, err: &RoomError) {
        let message = err.to_string();
        let event = if err.is_move_error() {
            ServerEvent::MoveError { message }
        } else {
            ServerEvent::Error { message }
        };
        self.deliver(Recipient::Only(conn), &Notice::Room(event));
    }

    fn evict(&mut self, conn: ConnectionId, reason: EvictReason) {
        if let Some(sender) = self.senders.remove(&conn) {
            let _ = sender.send(Outbound::Evicted {
                room: self.code().clone(),
                game: E::KIND,
                reason,
            });
        }
    }

    fn evict_all(&mut self) {
        let conns: Vec<ConnectionId> = self.senders.keys().copied().collect();
        for conn in conns {
            self.evict(conn, EvictReason::Closed);
        }
    }

    fn info(&self) -> RoomInfo {
        let room = self.session.room();
        RoomInfo {
            code: room.code.clone(),
            game: E::KIND,
            status: room.status,
            player_count: room.players.len(),
            max_players: room.limits.max_players,
            round_count: room.round_count,
            created_at: room.created_at,
            last_activity_at: room.last_activity_at,
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `settings.mailbox_size` controls backpressure: if the channel fills
/// up, senders wait (bounded channel).
pub fn spawn_room<E: GameEngine>(
    code: RoomCode,
    config: E::Config,
    settings: RoomConfig,
    stats: StatsTracker,
) -> RoomHandle<E> {
    let (tx, rx) = mpsc::channel(settings.mailbox_size.max(1));
    let room = Room::<E>::new(code.clone(), config, &settings);
    let period = E::autoplay_period(&room.config).unwrap_or_default();

    // A room nobody manages to join is reaped like an abandoned one.
    let mut reap = Countdown::idle();
    reap.arm(settings.reap_grace);

    let actor = RoomActor::<E> {
        session: RoomSession::new(room, stats, settings),
        senders: HashMap::new(),
        codec: JsonCodec,
        seq: 0,
        receiver: rx,
        next_round: Countdown::idle(),
        reap,
        teardown: Countdown::idle(),
        autoplay: Repeater::new(period),
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        sender: tx,
        _engine: PhantomData,
    }
}
