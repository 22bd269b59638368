//! Core protocol types for the hangout wire format.
//!
//! Every type in this module travels "on the wire": it is serialized to
//! JSON, sent over the WebSocket, and parsed by the browser (or the other
//! way round).
//!
//! Both directions use the same adjacently tagged shape:
//!
//! ```json
//! { "seq": 7, "timestamp": 1700000000000,
//!   "payload": { "event": "make-move", "data": { "roomId": "R1", "cell": 4 } } }
//! ```
//!
//! `event` names are kebab-case, field names are camelCase, which is what
//! browser code expects.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hangout_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Milliseconds since the Unix epoch, used for every timestamp the server
/// hands to clients.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identifier players type to meet in the same room.
///
/// Codes are case-normalized on the way in (`"abc"` and `"ABC"` are the
/// same room), trimmed, and restricted to `[A-Za-z0-9_-]` with at most
/// [`RoomCode::MAX_LEN`] characters. Because parsing is the only way to
/// build one, every `RoomCode` in the server is already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Longest accepted room code, in characters.
    pub const MAX_LEN: usize = 32;

    /// Normalizes and validates a raw room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] for empty, oversized, or
    /// non-alphanumeric codes.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.chars().count() <= Self::MAX_LEN
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which game a room plays.
///
/// The same code can host one room per game kind; `"R1"` for tic-tac-toe
/// and `"R1"` for bingo are different rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    /// Two players, 3×3 board.
    #[default]
    #[serde(alias = "tictactoe", alias = "ttt")]
    TicTacToe,
    /// One caller, many cards.
    Bingo,
    /// Lines and boxes, up to eight players.
    #[serde(alias = "dots", alias = "dotslines")]
    DotsAndBoxes,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicTacToe => write!(f, "tic-tac-toe"),
            Self::Bingo => write!(f, "bingo"),
            Self::DotsAndBoxes => write!(f, "dots-and-boxes"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a notification?
// ---------------------------------------------------------------------------

/// Specifies who inside a room should receive a server event.
///
/// Game engines and the room controller return `(Recipient, event)` pairs;
/// the room actor turns each pair into frames for the right sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the room.
    All,

    /// One member only, e.g. a rejected move or a chat history reply.
    Only(ConnectionId),

    /// Everyone except one member, e.g. chat without echo.
    AllExcept(ConnectionId),
}

impl Recipient {
    /// Returns `true` if `conn` is addressed by this recipient.
    pub fn includes(&self, conn: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => *target == conn,
            Self::AllExcept(excluded) => *excluded != conn,
        }
    }
}

// ---------------------------------------------------------------------------
// Move arguments
// ---------------------------------------------------------------------------

/// Direction of a dots-and-boxes line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Joins two dots in the same row.
    #[serde(alias = "h")]
    Horizontal,
    /// Joins two dots in the same column.
    #[serde(alias = "v")]
    Vertical,
}

/// Addresses one line slot on a dots-and-boxes grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRef {
    /// Horizontal or vertical.
    #[serde(alias = "type")]
    pub orientation: Orientation,
    /// Row index of the line's first dot.
    pub row: usize,
    /// Column index of the line's first dot.
    pub col: usize,
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.orientation {
            Orientation::Horizontal => 'h',
            Orientation::Vertical => 'v',
        };
        write!(f, "{tag}({},{})", self.row, self.col)
    }
}

/// The single argument of a game move, before any engine has looked at it.
///
/// Each engine accepts exactly one of these shapes and rejects the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRequest {
    /// `make-move`: a board cell index.
    Cell(usize),
    /// `draw-line`: a line slot.
    Line(LineRef),
    /// `call-number`: a bingo number.
    Number(u32),
}

impl MoveRequest {
    /// The client event name that carries this kind of move.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Cell(_) => "make-move",
            Self::Line(_) => "draw-line",
            Self::Number(_) => "call-number",
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// One stored chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Room-local, strictly increasing id.
    pub id: u64,
    /// Display name of the sender.
    pub author: String,
    /// Trimmed message text.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// ClientEvent: everything a browser can ask for
// ---------------------------------------------------------------------------

/// A command sent by a client.
///
/// One variant per event name, each with typed fields. A frame that does
/// not match any variant is rejected at decode time, so nothing malformed
/// ever reaches a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Join (or create) a room. `game` defaults to tic-tac-toe; `options`
    /// carries variant parameters such as a bingo card size.
    JoinRoom {
        room_id: RoomCode,
        #[serde(alias = "playerName", alias = "name")]
        display_name: String,
        #[serde(default)]
        game: GameKind,
        #[serde(default)]
        options: Option<serde_json::Value>,
    },

    /// Leave the current room without closing the socket.
    LeaveRoom,

    /// Tic-tac-toe: claim a cell (0–8).
    MakeMove { room_id: RoomCode, cell: usize },

    /// Dots-and-boxes: draw a line.
    DrawLine { room_id: RoomCode, line: LineRef },

    /// Bingo: call a number (caller only).
    CallNumber { room_id: RoomCode, number: u32 },

    /// Bingo: switch the automatic caller on or off (caller only).
    ToggleAutoCall { room_id: RoomCode },

    /// Dots-and-boxes: pass the turn.
    SkipTurn { room_id: RoomCode },

    /// Dots-and-boxes: ask for a suggested line.
    RequestHint { room_id: RoomCode },

    /// Start the next round right away.
    ResetGame { room_id: RoomCode },

    /// Same as `reset-game`, sent by "play again" buttons.
    NextGame { room_id: RoomCode },

    /// Stop the session; the room idles until `restart-game`.
    StopPlaying { room_id: RoomCode },

    /// Leave the stopped state with a fresh board.
    RestartGame { room_id: RoomCode },

    /// Close the room for everyone.
    TerminateRoom { room_id: RoomCode },

    /// Post a chat line.
    SendMessage { room_id: RoomCode, text: String },

    /// Fan out an ephemeral reaction (emoji, sticker, ...).
    SendReaction {
        room_id: RoomCode,
        reaction: serde_json::Value,
    },

    /// Ask for the stored chat log.
    GetChatHistory { room_id: RoomCode },

    /// Keep-alive; answered with `heartbeat-ack`.
    Heartbeat { client_time: u64 },
}

impl ClientEvent {
    /// The kebab-case event name, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom => "leave-room",
            Self::MakeMove { .. } => "make-move",
            Self::DrawLine { .. } => "draw-line",
            Self::CallNumber { .. } => "call-number",
            Self::ToggleAutoCall { .. } => "toggle-auto-call",
            Self::SkipTurn { .. } => "skip-turn",
            Self::RequestHint { .. } => "request-hint",
            Self::ResetGame { .. } => "reset-game",
            Self::NextGame { .. } => "next-game",
            Self::StopPlaying { .. } => "stop-playing",
            Self::RestartGame { .. } => "restart-game",
            Self::TerminateRoom { .. } => "terminate-room",
            Self::SendMessage { .. } => "send-message",
            Self::SendReaction { .. } => "send-reaction",
            Self::GetChatHistory { .. } => "get-chat-history",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    /// The room a room-scoped command targets.
    ///
    /// `None` for connection-level events (`leave-room`, `heartbeat`).
    /// `join-room` returns the room being joined.
    pub fn room_id(&self) -> Option<&RoomCode> {
        match self {
            Self::LeaveRoom | Self::Heartbeat { .. } => None,
            Self::JoinRoom { room_id, .. }
            | Self::MakeMove { room_id, .. }
            | Self::DrawLine { room_id, .. }
            | Self::CallNumber { room_id, .. }
            | Self::ToggleAutoCall { room_id }
            | Self::SkipTurn { room_id }
            | Self::RequestHint { room_id }
            | Self::ResetGame { room_id }
            | Self::NextGame { room_id }
            | Self::StopPlaying { room_id }
            | Self::RestartGame { room_id }
            | Self::TerminateRoom { room_id }
            | Self::SendMessage { room_id, .. }
            | Self::SendReaction { room_id, .. }
            | Self::GetChatHistory { room_id } => Some(room_id),
        }
    }

    /// The move argument, if this is one of the three move events.
    pub fn move_request(&self) -> Option<MoveRequest> {
        match self {
            Self::MakeMove { cell, .. } => Some(MoveRequest::Cell(*cell)),
            Self::DrawLine { line, .. } => Some(MoveRequest::Line(*line)),
            Self::CallNumber { number, .. } => Some(MoveRequest::Number(*number)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: room-independent notifications
// ---------------------------------------------------------------------------

/// A notification sent by the server.
///
/// `S` is the snapshot type carried by `game-state`; connection-level code
/// that never sends snapshots uses the default `()`. Game-specific events
/// (`number-called`, `line-drawn`, ...) are defined next to each engine and
/// share the same `{"event", "data"}` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent<S = ()> {
    /// Greeting sent once per socket.
    Connected { connection_id: ConnectionId },

    /// Answer to `heartbeat`.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Full sanitized room snapshot.
    GameState(S),

    /// Private: the join went through.
    JoinSuccess {
        room_id: RoomCode,
        game: GameKind,
        display_name: String,
        reconnected: bool,
    },

    /// Someone took a seat.
    PlayerJoined {
        display_name: String,
        count: usize,
        max_players: usize,
    },

    /// Someone left or disconnected.
    PlayerLeft { display_name: String, count: usize },

    /// Private: capacity rejection.
    RoomFull { message: String },

    /// Private: any other join rejection.
    JoinError { message: String },

    /// Private: a move or game command was rejected.
    MoveError { message: String },

    /// A new round started.
    GameReset {
        round_count: u32,
        next_starter: Option<String>,
    },

    /// The next round was started by the timer rather than a player.
    AutoNextGame { round_count: u32 },

    /// The session was stopped.
    GameStopped { stopped_by: String },

    /// The automatic caller was switched on or off.
    AutoCallToggled { enabled: bool, toggled_by: String },

    /// A chat line was posted.
    NewMessage(ChatMessage),

    /// Private: the stored chat log.
    ChatHistory { messages: Vec<ChatMessage> },

    /// Ephemeral reaction, never stored.
    ShowReaction {
        from: String,
        reaction: serde_json::Value,
    },

    /// The room is closing.
    RoomTerminated {
        terminated_by: String,
        message: String,
    },

    /// Private: `leave-room` completed.
    RoomLeft { room_id: RoomCode },

    /// Private: generic failure.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the wire is an Envelope.
///
/// Server-sent room events carry the room's own sequence number, so a
/// client can tell that it saw every mutation in order. Connection-level
/// notices (greeting, heartbeat, private errors) use `seq = 0`. Clients may
/// omit both `seq` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Per-room sequence number (0 for connection-level notices).
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,

    /// The event itself.
    pub payload: P,
}

impl<P> Envelope<P> {
    /// Wraps a connection-level payload stamped with the current time.
    pub fn unsequenced(payload: P) -> Self {
        Self {
            seq: 0,
            timestamp: now_millis(),
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
