//! Bingo: one caller, one card per player, many possible winners.
//!
//! Every player gets their own shuffled card drawn from the room's number
//! pool. The caller (the first player to join, then whoever inherits the
//! seat) calls numbers one at a time, either by hand or through the
//! automatic caller; each call is marked on every card at once. Rows,
//! columns, both diagonals and the full card are winning patterns, and each
//! player can claim each pattern once per round.
//!
//! A round ends on the first full house, when `max_winners` different
//! players have claimed something, or when the pool runs out.

use std::collections::HashSet;
use std::time::Duration;

use hangout_protocol::{ConnectionId, GameKind, MoveRequest, Recipient};
use hangout_room::{
    EndReason, GameEngine, MoveError, Outbox, Player, Room, RoomLimits, RoundEnd,
};
use hangout_session::Outcome;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

/// Hard cap on players per bingo room.
pub const MAX_PLAYERS: usize = 100;

const MIN_AUTO_CALL_MS: u64 = 1_000;
const MAX_AUTO_CALL_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Card dimensions and the matching number pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    /// 3×3, numbers 1–25.
    Small,
    /// 5×5, numbers 1–75.
    #[default]
    Medium,
    /// 7×7, numbers 1–100.
    Large,
}

impl CardSize {
    pub fn side(self) -> usize {
        match self {
            Self::Small => 3,
            Self::Medium => 5,
            Self::Large => 7,
        }
    }

    /// Highest number in the pool; the pool always starts at 1.
    pub fn pool_max(self) -> u32 {
        match self {
            Self::Small => 25,
            Self::Medium => 75,
            Self::Large => 100,
        }
    }

    /// Cards of 5×5 and up have a pre-marked free centre.
    pub fn has_free_centre(self) -> bool {
        self.side() >= 5
    }
}

/// Variant options, read from `join-room.options`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BingoConfig {
    pub size: CardSize,
    /// Distinct winners after which the round ends.
    #[serde(alias = "max_winners")]
    pub max_winners: usize,
    /// 1 allows solo play.
    #[serde(alias = "min_players")]
    pub min_players: usize,
    #[serde(alias = "max_players")]
    pub max_players: usize,
    /// Automatic caller period in milliseconds.
    #[serde(alias = "auto_call_ms")]
    pub auto_call_ms: u64,
}

impl Default for BingoConfig {
    fn default() -> Self {
        Self {
            size: CardSize::Medium,
            max_winners: 3,
            min_players: 2,
            max_players: MAX_PLAYERS,
            auto_call_ms: 5_000,
        }
    }
}

impl BingoConfig {
    pub fn auto_call_period(&self) -> Duration {
        Duration::from_millis(self.auto_call_ms.clamp(MIN_AUTO_CALL_MS, MAX_AUTO_CALL_MS))
    }
}

// ---------------------------------------------------------------------------
// Cards and patterns
// ---------------------------------------------------------------------------

/// One square of a card. `number` is `None` for the free centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Square {
    pub number: Option<u32>,
    pub marked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    Row,
    Column,
    Diagonal,
    FullHouse,
}

/// A completed pattern on one card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Row or column number; 0 for the main diagonal, 1 for the other.
    pub index: usize,
    /// Square indices, row-major.
    pub cells: Vec<usize>,
}

/// A player's card for the current round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoCard {
    pub side: usize,
    pub squares: Vec<Square>,
    /// Patterns this card has already won with.
    pub claimed: Vec<Pattern>,
}

impl BingoCard {
    /// Deals a random card for `size`, with `called` already marked.
    pub fn deal(size: CardSize, called: &[u32]) -> Self {
        let side = size.side();
        let mut pool: Vec<u32> = (1..=size.pool_max()).collect();
        pool.shuffle(&mut rand::rng());

        let mut squares: Vec<Square> = pool
            .into_iter()
            .take(side * side)
            .map(|n| Square {
                number: Some(n),
                marked: called.contains(&n),
            })
            .collect();
        if size.has_free_centre() {
            squares[side * side / 2] = Square {
                number: None,
                marked: true,
            };
        }
        Self {
            side,
            squares,
            claimed: Vec::new(),
        }
    }

    /// Builds a card from explicit numbers. `None` is a free square.
    pub fn from_numbers(side: usize, numbers: &[Option<u32>]) -> Self {
        Self {
            side,
            squares: numbers
                .iter()
                .map(|n| Square {
                    number: *n,
                    marked: n.is_none(),
                })
                .collect(),
            claimed: Vec::new(),
        }
    }

    /// Marks `number` if the card has it. Returns whether anything changed.
    pub fn mark(&mut self, number: u32) -> bool {
        match self
            .squares
            .iter_mut()
            .find(|s| s.number == Some(number) && !s.marked)
        {
            Some(square) => {
                square.marked = true;
                true
            }
            None => false,
        }
    }

    fn all_marked(&self, cells: &[usize]) -> bool {
        cells.iter().all(|&i| self.squares[i].marked)
    }

    /// Every pattern currently complete on this card.
    pub fn completed_patterns(&self) -> Vec<Pattern> {
        let n = self.side;
        let mut candidates = Vec::with_capacity(2 * n + 3);
        for row in 0..n {
            candidates.push(Pattern {
                kind: PatternKind::Row,
                index: row,
                cells: (0..n).map(|col| row * n + col).collect(),
            });
        }
        for col in 0..n {
            candidates.push(Pattern {
                kind: PatternKind::Column,
                index: col,
                cells: (0..n).map(|row| row * n + col).collect(),
            });
        }
        candidates.push(Pattern {
            kind: PatternKind::Diagonal,
            index: 0,
            cells: (0..n).map(|i| i * n + i).collect(),
        });
        candidates.push(Pattern {
            kind: PatternKind::Diagonal,
            index: 1,
            cells: (0..n).map(|i| i * n + (n - 1 - i)).collect(),
        });
        candidates.push(Pattern {
            kind: PatternKind::FullHouse,
            index: 0,
            cells: (0..n * n).collect(),
        });
        candidates.retain(|p| self.all_marked(&p.cells));
        candidates
    }

    /// Claims patterns completed since the last call and returns them.
    fn claim_new(&mut self) -> Vec<Pattern> {
        let fresh: Vec<Pattern> = self
            .completed_patterns()
            .into_iter()
            .filter(|p| !self.claimed.contains(p))
            .collect();
        self.claimed.extend(fresh.iter().cloned());
        fresh
    }
}

// ---------------------------------------------------------------------------
// Board and events
// ---------------------------------------------------------------------------

/// One winning claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoBoard {
    pub size: CardSize,
    pub pool_max: u32,
    /// Numbers called this round, in call order.
    pub called: Vec<u32>,
    pub caller: Option<ConnectionId>,
    /// Every claim this round, in order.
    pub winners: Vec<Winner>,
    pub max_winners: usize,
}

impl BingoBoard {
    fn new(config: &BingoConfig, caller: Option<ConnectionId>) -> Self {
        Self {
            size: config.size,
            pool_max: config.size.pool_max(),
            called: Vec::new(),
            caller,
            winners: Vec::new(),
            max_winners: config.max_winners.max(1),
        }
    }

    pub fn last_called(&self) -> Option<u32> {
        self.called.last().copied()
    }

    pub fn remaining(&self) -> Vec<u32> {
        (1..=self.pool_max).filter(|n| !self.called.contains(n)).collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.called.len() as u32 >= self.pool_max
    }

    /// Players with at least one claim, in the order they first won.
    pub fn distinct_winners(&self) -> Vec<ConnectionId> {
        let mut seen = HashSet::new();
        self.winners
            .iter()
            .map(|w| w.connection_id)
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

/// A number to call. `auto` is set when the automatic caller picked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub number: u32,
    pub auto: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum BingoEvent {
    NumberCalled {
        number: u32,
        called_by: String,
        auto: bool,
        total_called: usize,
        remaining: usize,
    },
    BingoWinners {
        /// Claims made by this call.
        winners: Vec<Winner>,
        /// Claims so far this round.
        total: usize,
    },
    CallerChanged {
        caller: Option<String>,
        previous: String,
    },
    GameFinished {
        reason: EndReason,
        winners: Vec<String>,
        total_called: usize,
        round_count: u32,
    },
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

pub struct Bingo;

fn is_caller(room: &Room<Bingo>, conn: ConnectionId) -> Result<(), MoveError> {
    if !room.is_member(conn) {
        return Err(MoveError::NotAPlayer);
    }
    if room.board.caller != Some(conn) {
        return Err(MoveError::NotCaller);
    }
    Ok(())
}

impl GameEngine for Bingo {
    type Config = BingoConfig;
    type Board = BingoBoard;
    type Role = BingoCard;
    type Move = Call;
    type Event = BingoEvent;

    const KIND: GameKind = GameKind::Bingo;

    fn limits(config: &BingoConfig) -> RoomLimits {
        RoomLimits::new(config.min_players, config.max_players.min(MAX_PLAYERS))
    }

    fn new_board(config: &BingoConfig) -> BingoBoard {
        BingoBoard::new(config, None)
    }

    fn seat(room: &mut Room<Self>, conn: ConnectionId) -> BingoCard {
        if room.board.caller.is_none() {
            room.board.caller = Some(conn);
        }
        BingoCard::deal(room.board.size, &room.board.called)
    }

    fn decode_move(request: MoveRequest) -> Result<Call, MoveError> {
        match request {
            MoveRequest::Number(number) => Ok(Call { number, auto: false }),
            _ => Err(MoveError::Unsupported),
        }
    }

    fn apply_move(room: &mut Room<Self>, sender: ConnectionId, call: Call) -> Result<Outbox<Self>, MoveError> {
        is_caller(room, sender)?;
        let number = call.number;
        if !(1..=room.board.pool_max).contains(&number) {
            return Err(MoveError::OutOfRange);
        }
        if room.board.called.contains(&number) {
            return Err(MoveError::AlreadyCalled(number));
        }

        room.board.called.push(number);
        let mut claims = Vec::new();
        // Every card is scanned. A late joiner's card can arrive with a
        // pattern already complete.
        for player in &mut room.players {
            player.role.mark(number);
            for pattern in player.role.claim_new() {
                claims.push(Winner {
                    connection_id: player.conn,
                    display_name: player.display_name.clone(),
                    pattern,
                });
            }
        }
        room.board.winners.extend(claims.iter().cloned());

        let mut out = vec![(
            Recipient::All,
            BingoEvent::NumberCalled {
                number,
                called_by: room.name_of(sender).to_string(),
                auto: call.auto,
                total_called: room.board.called.len(),
                remaining: room.board.pool_max as usize - room.board.called.len(),
            },
        )];
        if !claims.is_empty() {
            tracing::info!(room_id = %room.code, number, claims = claims.len(), "bingo claimed");
            out.push((
                Recipient::All,
                BingoEvent::BingoWinners {
                    winners: claims,
                    total: room.board.winners.len(),
                },
            ));
        }
        Ok(out)
    }

    fn check_end(room: &Room<Self>) -> Option<RoundEnd> {
        let board = &room.board;
        let winners = board.distinct_winners();
        let reason = if board.winners.iter().any(|w| w.pattern.kind == PatternKind::FullHouse) {
            EndReason::FullHouse
        } else if winners.len() >= board.max_winners {
            EndReason::WinnerLimit
        } else if board.is_exhausted() {
            EndReason::PoolExhausted
        } else {
            return None;
        };

        let standings = room
            .conns()
            .map(|c| {
                let outcome = if winners.contains(&c) {
                    Outcome::Win
                } else if winners.is_empty() {
                    Outcome::Tie
                } else {
                    Outcome::Loss
                };
                (c, outcome)
            })
            .collect();
        Some(RoundEnd {
            reason,
            winners,
            standings,
        })
    }

    fn announce_end(room: &Room<Self>, end: &RoundEnd) -> Outbox<Self> {
        let winners = end
            .winners
            .iter()
            .filter_map(|c| {
                room.board
                    .winners
                    .iter()
                    .find(|w| w.connection_id == *c)
                    .map(|w| w.display_name.clone())
            })
            .collect();
        vec![(
            Recipient::All,
            BingoEvent::GameFinished {
                reason: end.reason,
                winners,
                total_called: room.board.called.len(),
                round_count: room.round_count,
            },
        )]
    }

    fn reset(room: &mut Room<Self>) {
        let caller = room
            .board
            .caller
            .filter(|c| room.is_member(*c))
            .or_else(|| room.players.first().map(|p| p.conn));
        room.board = BingoBoard::new(&room.config, caller);
        let size = room.board.size;
        for player in &mut room.players {
            player.role = BingoCard::deal(size, &[]);
        }
    }

    fn on_player_left(room: &mut Room<Self>, departed: &Player<BingoCard>, index: usize) -> Outbox<Self> {
        if room.board.caller != Some(departed.conn) {
            return Vec::new();
        }
        // The next player in join order inherits the call.
        let next = if room.players.is_empty() {
            None
        } else {
            room.players.get(index % room.players.len())
        };
        room.board.caller = next.map(|p| p.conn);
        let caller = next.map(|p| p.display_name.clone());
        tracing::info!(room_id = %room.code, previous = %departed.display_name, caller = ?caller, "caller reassigned");
        vec![(
            Recipient::All,
            BingoEvent::CallerChanged {
                caller,
                previous: departed.display_name.clone(),
            },
        )]
    }

    fn rebind(room: &mut Room<Self>, old: ConnectionId, new: ConnectionId) {
        if room.board.caller == Some(old) {
            room.board.caller = Some(new);
        }
        for winner in &mut room.board.winners {
            if winner.connection_id == old {
                winner.connection_id = new;
            }
        }
    }

    fn next_starter(room: &Room<Self>) -> Option<String> {
        room.board.caller.map(|c| room.name_of(c).to_string())
    }

    fn autoplay_period(config: &BingoConfig) -> Option<Duration> {
        Some(config.auto_call_period())
    }

    fn may_toggle_autoplay(room: &Room<Self>, conn: ConnectionId) -> Result<(), MoveError> {
        is_caller(room, conn)
    }

    fn autoplay_actor(room: &Room<Self>) -> Option<ConnectionId> {
        room.board.caller
    }

    fn autoplay_move(room: &Room<Self>) -> Option<(ConnectionId, Call)> {
        let caller = room.board.caller?;
        let number = *room.board.remaining().choose(&mut rand::rng())?;
        Some((caller, Call { number, auto: true }))
    }

    fn may_reset(room: &Room<Self>, conn: ConnectionId) -> Result<(), MoveError> {
        is_caller(room, conn)
    }
}

// =========================================================================
// Tests
// =========================================================================
