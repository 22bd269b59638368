//! The room session controller.
//!
//! `RoomSession` is the one place where room rules that every game shares
//! are enforced: joining and seat takeover, the status state machine,
//! round bookkeeping, stats, chat, and which timers should run. It calls
//! into the [`GameEngine`] for everything game-specific.
//!
//! It is deliberately synchronous and I/O free. Every operation returns a
//! list of [`Effect`]s (events to deliver, members to evict, timers to
//! arm or cancel) and the room actor carries them out in order. That keeps
//! the whole state machine testable without a runtime.

use std::time::Duration;

use hangout_protocol::{ChatMessage, ConnectionId, MoveRequest, Recipient, ServerEvent, now_millis};
use hangout_session::StatsTracker;
use tracing::{debug, info};

use crate::logic::Outbox;
use crate::{
    GameEngine, MoveError, Notice, Player, PlayerView, Room, RoomConfig, RoomError, RoomSnapshot,
    RoomStatus, RoundEnd, RoundSummary, SnapshotOf,
};

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A room-scoped command from a seated member.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `make-move`, `draw-line`, `call-number`.
    Move(MoveRequest),
    /// `reset-game`.
    Reset,
    /// `next-game`.
    NextGame,
    /// `stop-playing`.
    Stop,
    /// `restart-game`.
    Restart,
    /// `toggle-auto-call`.
    ToggleAutoPlay,
    /// `skip-turn`.
    SkipTurn,
    /// `request-hint`.
    Hint,
    /// `send-message`.
    Chat(String),
    /// `send-reaction`.
    React(serde_json::Value),
    /// `get-chat-history`.
    ChatHistory,
    /// `terminate-room`.
    Terminate,
}

/// A timer change requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    ScheduleNextRound(Duration),
    CancelNextRound,
    StartAutoPlay(Duration),
    StopAutoPlay,
    ScheduleReap(Duration),
    CancelReap,
    ScheduleTeardown(Duration),
}

/// One thing the room actor must do after an operation.
pub enum Effect<E: GameEngine> {
    /// Deliver a notice to some members.
    Send(Recipient, Notice<E>),
    /// Drop a connection that lost its seat.
    Evict(ConnectionId),
    /// Arm or cancel a timer.
    Timer(TimerOp),
}

impl<E: GameEngine> std::fmt::Debug for Effect<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send(to, notice) => f.debug_tuple("Send").field(to).field(notice).finish(),
            Self::Evict(conn) => f.debug_tuple("Evict").field(conn).finish(),
            Self::Timer(op) => f.debug_tuple("Timer").field(op).finish(),
        }
    }
}

/// Result of a successful join.
pub struct Joined<E: GameEngine> {
    pub effects: Vec<Effect<E>>,
    /// The connection whose seat was taken over, if any.
    pub replaced: Option<ConnectionId>,
    /// `true` when the join took over an existing seat.
    pub reconnected: bool,
}

impl<E: GameEngine> std::fmt::Debug for Joined<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joined")
            .field("effects", &self.effects)
            .field("replaced", &self.replaced)
            .field("reconnected", &self.reconnected)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RoomSession
// ---------------------------------------------------------------------------

/// Drives one [`Room`] through its lifecycle.
pub struct RoomSession<E: GameEngine> {
    room: Room<E>,
    stats: StatsTracker,
    settings: RoomConfig,
    autoplay: bool,
    terminating: bool,
}

impl<E: GameEngine> RoomSession<E> {
    pub fn new(room: Room<E>, stats: StatsTracker, settings: RoomConfig) -> Self {
        Self {
            room,
            stats,
            settings,
            autoplay: false,
            terminating: false,
        }
    }

    pub fn room(&self) -> &Room<E> {
        &self.room
    }

    /// Whether automatic play is on.
    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Whether the room was terminated and is waiting to close.
    pub fn is_terminating(&self) -> bool {
        self.terminating
    }

    /// Builds the sanitized client view of the room.
    pub fn snapshot(&self) -> SnapshotOf<E> {
        let room = &self.room;
        RoomSnapshot {
            room_id: room.code.clone(),
            game: E::KIND,
            status: room.status,
            players: room
                .players
                .iter()
                .map(|p| PlayerView {
                    connection_id: p.conn,
                    display_name: p.display_name.clone(),
                    role: p.role.clone(),
                    stats: self.stats.get(p.conn).unwrap_or_default(),
                    joined_at: p.joined_at,
                })
                .collect(),
            min_players: room.limits.min_players,
            max_players: room.limits.max_players,
            board: room.board.clone(),
            round_count: room.round_count,
            auto_play: self.autoplay,
            history: room.history.to_vec(),
            chat: room.chat.to_vec(),
            created_at: room.created_at,
            last_activity_at: room.last_activity_at,
        }
    }

    // -- join / leave ------------------------------------------------------

    /// Seats a connection.
    ///
    /// A name that is already seated takes that seat over instead: the
    /// seat keeps its role and stats and the old connection is evicted.
    ///
    /// # Errors
    /// `InvalidName`, `AlreadyInRoom`, `RoomFull`, or `InvalidState` while
    /// the room is closing. The room is unchanged on error.
    pub fn join(&mut self, conn: ConnectionId, display_name: &str) -> Result<Joined<E>, RoomError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName("display name is empty".into()));
        }
        if name.chars().count() > self.settings.max_name_len {
            return Err(RoomError::InvalidName(format!(
                "display name is longer than {} characters",
                self.settings.max_name_len
            )));
        }
        if self.terminating {
            return Err(RoomError::InvalidState("the room is closing".into()));
        }
        if self.room.is_member(conn) {
            return Err(RoomError::AlreadyInRoom(conn, self.room.code.clone()));
        }

        let mut fx = vec![Effect::Timer(TimerOp::CancelReap)];

        if let Some(index) = self.room.index_by_name(name) {
            let old = self.room.players[index].conn;
            self.room.players[index].conn = conn;
            self.stats.rebind(old, conn);
            self.stats.get_or_create(conn, name);
            E::rebind(&mut self.room, old, conn);
            self.room.touch();
            info!(room_id = %self.room.code, %old, new = %conn, player = name, "seat taken over");

            fx.push(Effect::Evict(old));
            self.push_join_notices(&mut fx, conn, name, true);
            return Ok(Joined {
                effects: fx,
                replaced: Some(old),
                reconnected: true,
            });
        }

        if self.room.is_full() {
            return Err(RoomError::RoomFull(self.room.code.clone()));
        }

        let role = E::seat(&mut self.room, conn);
        self.room.players.push(Player {
            conn,
            display_name: name.to_string(),
            role,
            joined_at: now_millis(),
        });
        self.stats.get_or_create(conn, name);
        self.room.touch();
        info!(
            room_id = %self.room.code,
            %conn,
            player = name,
            players = self.room.players.len(),
            "player joined"
        );

        if self.room.status == RoomStatus::Waiting && self.room.has_quorum() {
            if E::check_end(&self.room).is_some() {
                E::reset(&mut self.room);
            }
            self.set_status(RoomStatus::Playing);
        }

        self.push_join_notices(&mut fx, conn, name, false);
        Ok(Joined {
            effects: fx,
            replaced: None,
            reconnected: false,
        })
    }

    fn push_join_notices(&self, fx: &mut Vec<Effect<E>>, conn: ConnectionId, name: &str, reconnected: bool) {
        fx.push(Effect::Send(
            Recipient::Only(conn),
            Notice::Room(ServerEvent::JoinSuccess {
                room_id: self.room.code.clone(),
                game: E::KIND,
                display_name: name.to_string(),
                reconnected,
            }),
        ));
        self.push_snapshot(fx);
        fx.push(self.room_event(ServerEvent::PlayerJoined {
            display_name: name.to_string(),
            count: self.room.players.len(),
            max_players: self.room.limits.max_players,
        }));
    }

    /// Removes a member (explicit leave or disconnect).
    ///
    /// # Errors
    /// `NotInRoom` if `conn` holds no seat.
    pub fn leave(&mut self, conn: ConnectionId) -> Result<Vec<Effect<E>>, RoomError> {
        let index = self
            .room
            .index_of(conn)
            .ok_or_else(|| RoomError::NotInRoom(conn, self.room.code.clone()))?;

        let drives_autoplay = self.autoplay && E::autoplay_actor(&self.room) == Some(conn);
        let departed = self.room.players.remove(index);
        let events = E::on_player_left(&mut self.room, &departed, index);
        self.room.touch();
        info!(
            room_id = %self.room.code,
            %conn,
            player = %departed.display_name,
            players = self.room.players.len(),
            "player left"
        );

        let mut fx = Vec::new();
        if drives_autoplay {
            self.stop_autoplay(&mut fx, &departed.display_name);
        }
        push_game(&mut fx, events);

        if self.room.players.is_empty() {
            self.stop_autoplay(&mut fx, &departed.display_name);
            fx.push(Effect::Timer(TimerOp::CancelNextRound));
            fx.push(Effect::Timer(TimerOp::ScheduleReap(self.settings.reap_grace)));
        }
        if !self.room.has_quorum() {
            if matches!(self.room.status, RoomStatus::Playing | RoomStatus::Finished) {
                self.set_status(RoomStatus::Waiting);
            }
            fx.push(Effect::Timer(TimerOp::CancelNextRound));
        }

        fx.push(self.room_event(ServerEvent::PlayerLeft {
            display_name: departed.display_name.clone(),
            count: self.room.players.len(),
        }));
        self.push_snapshot(&mut fx);
        Ok(fx)
    }

    // -- commands ------------------------------------------------------------

    /// Runs a member's command.
    ///
    /// # Errors
    /// `NotInRoom` for non-members, `Move(..)` for rule violations, and
    /// `InvalidState`/`InvalidMessage` for commands that make no sense
    /// right now. Nothing changes on error.
    pub fn act(&mut self, conn: ConnectionId, action: Action) -> Result<Vec<Effect<E>>, RoomError> {
        if !self.room.is_member(conn) {
            return Err(RoomError::NotInRoom(conn, self.room.code.clone()));
        }
        if self.terminating && action != Action::ChatHistory {
            return Err(RoomError::InvalidState("the room is closing".into()));
        }
        let name = self.room.name_of(conn).to_string();

        let mut fx = Vec::new();
        match action {
            Action::Move(request) => {
                if !self.room.status.is_active() {
                    return Err(MoveError::NotActive.into());
                }
                let mv = E::decode_move(request)?;
                self.play(&mut fx, conn, mv)?;
            }
            Action::Reset | Action::NextGame => {
                if self.room.status == RoomStatus::Stopped {
                    return Err(RoomError::InvalidState(
                        "the session is stopped; restart it first".into(),
                    ));
                }
                E::may_reset(&self.room, conn)?;
                info!(room_id = %self.room.code, %conn, "round reset requested");
                self.start_next_round(&mut fx, &name);
            }
            Action::Stop => {
                if self.room.status == RoomStatus::Stopped {
                    return Err(RoomError::InvalidState("the session is already stopped".into()));
                }
                self.stop_autoplay(&mut fx, &name);
                fx.push(Effect::Timer(TimerOp::CancelNextRound));
                self.set_status(RoomStatus::Stopped);
                info!(room_id = %self.room.code, %conn, "session stopped");
                fx.push(self.room_event(ServerEvent::GameStopped { stopped_by: name }));
                self.push_snapshot(&mut fx);
            }
            Action::Restart => {
                if self.room.status != RoomStatus::Stopped {
                    return Err(RoomError::InvalidState("the session is not stopped".into()));
                }
                self.room.history.clear();
                info!(room_id = %self.room.code, %conn, "session restarted");
                self.start_next_round(&mut fx, &name);
            }
            Action::ToggleAutoPlay => {
                let period = E::autoplay_period(&self.room.config).ok_or(MoveError::Unsupported)?;
                E::may_toggle_autoplay(&self.room, conn)?;
                if self.autoplay {
                    self.stop_autoplay(&mut fx, &name);
                } else {
                    if !self.room.status.is_active() {
                        return Err(MoveError::NotActive.into());
                    }
                    self.autoplay = true;
                    fx.push(Effect::Timer(TimerOp::StartAutoPlay(period)));
                    fx.push(self.room_event(ServerEvent::AutoCallToggled {
                        enabled: true,
                        toggled_by: name,
                    }));
                }
                self.push_snapshot(&mut fx);
            }
            Action::SkipTurn => {
                if !self.room.status.is_active() {
                    return Err(MoveError::NotActive.into());
                }
                let events = E::skip_turn(&mut self.room, conn)?;
                self.push_snapshot(&mut fx);
                push_game(&mut fx, events);
            }
            Action::Hint => {
                if !self.room.status.is_active() {
                    return Err(MoveError::NotActive.into());
                }
                let events = E::hint(&self.room, conn)?;
                push_game(&mut fx, events);
            }
            Action::Chat(text) => {
                let message = self.post_chat(&name, &text)?;
                let to = if self.settings.echo_chat {
                    Recipient::All
                } else {
                    Recipient::AllExcept(conn)
                };
                fx.push(Effect::Send(to, Notice::Room(ServerEvent::NewMessage(message))));
            }
            Action::React(reaction) => {
                fx.push(self.room_event(ServerEvent::ShowReaction { from: name, reaction }));
            }
            Action::ChatHistory => {
                fx.push(Effect::Send(
                    Recipient::Only(conn),
                    Notice::Room(ServerEvent::ChatHistory {
                        messages: self.room.chat.to_vec(),
                    }),
                ));
            }
            Action::Terminate => {
                self.terminating = true;
                self.stop_autoplay(&mut fx, &name);
                fx.push(Effect::Timer(TimerOp::CancelNextRound));
                self.set_status(RoomStatus::Stopped);
                info!(room_id = %self.room.code, %conn, "room terminated");
                fx.push(self.room_event(ServerEvent::RoomTerminated {
                    message: format!("{name} closed the room"),
                    terminated_by: name,
                }));
                fx.push(Effect::Timer(TimerOp::ScheduleTeardown(self.settings.teardown_delay)));
            }
        }

        self.room.touch();
        Ok(fx)
    }

    // -- timers --------------------------------------------------------------

    /// The next-round timer fired.
    ///
    /// Does nothing unless the room is still `Finished` with enough
    /// players; a stop, reset or departure in the meantime wins.
    pub fn auto_continue(&mut self) -> Vec<Effect<E>> {
        let mut fx = Vec::new();
        if self.room.status != RoomStatus::Finished || !self.room.has_quorum() || self.terminating {
            debug!(room_id = %self.room.code, status = %self.room.status, "auto next round skipped");
            return fx;
        }
        info!(room_id = %self.room.code, round = self.room.round_count, "starting next round automatically");
        fx.push(self.room_event(ServerEvent::AutoNextGame {
            round_count: self.room.round_count,
        }));
        self.start_next_round(&mut fx, "auto");
        fx
    }

    /// The automatic-play timer fired.
    pub fn autoplay_tick(&mut self) -> Vec<Effect<E>> {
        let mut fx = Vec::new();
        if !self.autoplay {
            fx.push(Effect::Timer(TimerOp::StopAutoPlay));
            return fx;
        }
        if !self.room.status.is_active() {
            self.stop_autoplay(&mut fx, "auto");
            return fx;
        }
        let Some((actor, mv)) = E::autoplay_move(&self.room) else {
            debug!(room_id = %self.room.code, "nothing left to play automatically");
            self.stop_autoplay(&mut fx, "auto");
            self.push_snapshot(&mut fx);
            return fx;
        };
        if let Err(err) = self.play(&mut fx, actor, mv) {
            tracing::warn!(room_id = %self.room.code, %err, "automatic move rejected");
            self.stop_autoplay(&mut fx, "auto");
        }
        fx
    }

    // -- internals ------------------------------------------------------------

    /// Applies a move and, if it ends the round, records the round.
    fn play(&mut self, fx: &mut Vec<Effect<E>>, conn: ConnectionId, mv: E::Move) -> Result<(), RoomError> {
        let events = E::apply_move(&mut self.room, conn, mv)?;
        let end = E::check_end(&self.room);
        let mut closing = Vec::new();
        if let Some(end) = &end {
            self.finish_round(&mut closing, end);
        }
        self.push_snapshot(fx);
        push_game(fx, events);
        if let Some(end) = &end {
            push_game(fx, E::announce_end(&self.room, end));
        }
        fx.extend(closing);
        Ok(())
    }

    fn finish_round(&mut self, fx: &mut Vec<Effect<E>>, end: &RoundEnd) {
        self.set_status(RoomStatus::Finished);
        self.room.round_count += 1;

        let winners = end
            .winners
            .iter()
            .map(|conn| self.room.name_of(*conn).to_string())
            .collect::<Vec<_>>();
        self.room.history.push(RoundSummary {
            round: self.room.round_count,
            winners: winners.clone(),
            reason: end.reason,
            board: self.room.board.clone(),
            finished_at: now_millis(),
        });
        for (conn, outcome) in &end.standings {
            self.stats.update(*conn, *outcome);
        }
        info!(
            room_id = %self.room.code,
            round = self.room.round_count,
            reason = ?end.reason,
            ?winners,
            "round finished"
        );

        self.stop_autoplay(fx, "auto");
        if E::auto_continues() {
            fx.push(Effect::Timer(TimerOp::ScheduleNextRound(self.settings.next_round_delay)));
        }
    }

    fn start_next_round(&mut self, fx: &mut Vec<Effect<E>>, by: &str) {
        E::reset(&mut self.room);
        self.stop_autoplay(fx, by);
        fx.push(Effect::Timer(TimerOp::CancelNextRound));
        let status = if self.room.has_quorum() {
            RoomStatus::Playing
        } else {
            RoomStatus::Waiting
        };
        self.set_status(status);
        self.push_snapshot(fx);
        fx.push(self.room_event(ServerEvent::GameReset {
            round_count: self.room.round_count,
            next_starter: E::next_starter(&self.room),
        }));
    }

    fn stop_autoplay(&mut self, fx: &mut Vec<Effect<E>>, by: &str) {
        if !self.autoplay {
            return;
        }
        self.autoplay = false;
        fx.push(Effect::Timer(TimerOp::StopAutoPlay));
        fx.push(self.room_event(ServerEvent::AutoCallToggled {
            enabled: false,
            toggled_by: by.to_string(),
        }));
    }

    fn post_chat(&mut self, author: &str, text: &str) -> Result<ChatMessage, RoomError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RoomError::InvalidMessage("message is empty".into()));
        }
        if text.chars().count() > self.settings.max_message_len {
            return Err(RoomError::InvalidMessage(format!(
                "message is longer than {} characters",
                self.settings.max_message_len
            )));
        }
        Ok(self.room.push_chat(author, text))
    }

    fn set_status(&mut self, next: RoomStatus) {
        let current = self.room.status;
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            tracing::warn!(room_id = %self.room.code, from = %current, to = %next, "unexpected status change");
        }
        debug!(room_id = %self.room.code, from = %current, to = %next, "status changed");
        self.room.status = next;
    }

    fn push_snapshot(&self, fx: &mut Vec<Effect<E>>) {
        fx.push(self.room_event(ServerEvent::GameState(self.snapshot())));
    }

    fn room_event(&self, event: ServerEvent<SnapshotOf<E>>) -> Effect<E> {
        Effect::Send(Recipient::All, Notice::Room(event))
    }
}

fn push_game<E: GameEngine>(fx: &mut Vec<Effect<E>>, events: Outbox<E>) {
    fx.extend(
        events
            .into_iter()
            .map(|(to, event)| Effect::Send(to, Notice::Game(event))),
    );
}
