//! Dots-and-boxes for two to eight players.
//!
//! Players take turns drawing one line between neighbouring dots. Closing
//! the fourth side of a box scores it and earns another turn; a line that
//! closes nothing passes the turn on in join order. The round ends when
//! every box is claimed.

use hangout_protocol::{ConnectionId, GameKind, LineRef, MoveRequest, Orientation, Recipient};
use hangout_room::{
    EndReason, GameEngine, MoveError, Outbox, Player, Room, RoomLimits, RoundEnd,
};
use hangout_session::Outcome;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

pub const MAX_PLAYERS: usize = 8;

/// Seat colours, handed out first-free.
pub const PALETTE: [&str; MAX_PLAYERS] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD",
];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Dots per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSize {
    Small,
    #[default]
    Medium,
    Large,
    Huge,
}

impl GridSize {
    pub fn dots(self) -> usize {
        match self {
            Self::Small => 3,
            Self::Medium => 4,
            Self::Large => 5,
            Self::Huge => 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DotsConfig {
    pub grid: GridSize,
    #[serde(alias = "max_players")]
    pub max_players: usize,
}

impl Default for DotsConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::Medium,
            max_players: MAX_PLAYERS,
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Who drew a line or closed a box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stroke {
    pub player: String,
    pub color: &'static str,
}

/// Box coordinates, `(row, col)` of its top-left dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoxRef {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMove {
    pub player: String,
    pub line: LineRef,
    pub completed_boxes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DotsBoard {
    pub dots: usize,
    /// `dots` rows of `dots - 1` lines.
    pub horizontal: Vec<Vec<Option<Stroke>>>,
    /// `dots - 1` rows of `dots` lines.
    pub vertical: Vec<Vec<Option<Stroke>>>,
    /// `(dots - 1)²` boxes.
    pub boxes: Vec<Vec<Option<Stroke>>>,
    /// Seat index of the player to move.
    pub turn: usize,
    pub completed: usize,
    pub total_boxes: usize,
    pub last_move: Option<LastMove>,
}

impl DotsBoard {
    pub fn new(dots: usize, turn: usize) -> Self {
        let dots = dots.max(2);
        let span = dots - 1;
        Self {
            dots,
            horizontal: vec![vec![None; span]; dots],
            vertical: vec![vec![None; dots]; span],
            boxes: vec![vec![None; span]; span],
            turn,
            completed: 0,
            total_boxes: span * span,
            last_move: None,
        }
    }

    fn slot(&self, line: LineRef) -> Option<&Option<Stroke>> {
        let grid = match line.orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        };
        grid.get(line.row)?.get(line.col)
    }

    fn slot_mut(&mut self, line: LineRef) -> Option<&mut Option<Stroke>> {
        let grid = match line.orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        };
        grid.get_mut(line.row)?.get_mut(line.col)
    }

    pub fn is_drawn(&self, line: LineRef) -> bool {
        matches!(self.slot(line), Some(Some(_)))
    }

    /// Sides of a box already drawn.
    pub fn sides_drawn(&self, b: BoxRef) -> usize {
        [
            self.horizontal[b.row][b.col].is_some(),
            self.horizontal[b.row + 1][b.col].is_some(),
            self.vertical[b.row][b.col].is_some(),
            self.vertical[b.row][b.col + 1].is_some(),
        ]
        .into_iter()
        .filter(|drawn| *drawn)
        .count()
    }

    /// The one or two boxes a line borders.
    pub fn adjacent_boxes(&self, line: LineRef) -> Vec<BoxRef> {
        let span = self.dots - 1;
        let mut out = Vec::with_capacity(2);
        match line.orientation {
            Orientation::Horizontal => {
                if line.row > 0 {
                    out.push(BoxRef { row: line.row - 1, col: line.col });
                }
                if line.row < span {
                    out.push(BoxRef { row: line.row, col: line.col });
                }
            }
            Orientation::Vertical => {
                if line.col > 0 {
                    out.push(BoxRef { row: line.row, col: line.col - 1 });
                }
                if line.col < span {
                    out.push(BoxRef { row: line.row, col: line.col });
                }
            }
        }
        out
    }

    pub fn free_lines(&self) -> Vec<LineRef> {
        let mut lines = Vec::new();
        for (orientation, grid) in [
            (Orientation::Horizontal, &self.horizontal),
            (Orientation::Vertical, &self.vertical),
        ] {
            for (row, slots) in grid.iter().enumerate() {
                for (col, slot) in slots.iter().enumerate() {
                    if slot.is_none() {
                        lines.push(LineRef { orientation, row, col });
                    }
                }
            }
        }
        lines
    }

    /// Number of boxes drawing `line` would close right now.
    pub fn would_complete(&self, line: LineRef) -> usize {
        self.adjacent_boxes(line)
            .into_iter()
            .filter(|b| self.boxes[b.row][b.col].is_none() && self.sides_drawn(*b) == 3)
            .count()
    }

    /// Whether drawing `line` leaves a box with three sides for the next
    /// player.
    fn gives_away(&self, line: LineRef) -> bool {
        self.adjacent_boxes(line)
            .into_iter()
            .any(|b| self.boxes[b.row][b.col].is_none() && self.sides_drawn(b) == 2)
    }
}

// ---------------------------------------------------------------------------
// Seats and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DotsSeat {
    pub color: &'static str,
    /// Boxes closed this round.
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub name: String,
    pub score: u32,
    /// Share of all boxes, rounded.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum DotsEvent {
    LineDrawn {
        player_name: String,
        line: LineRef,
        completed_boxes: Vec<BoxRef>,
        new_score: u32,
        extra_turn: bool,
        next_player: Option<String>,
    },
    TurnSkipped {
        player_name: String,
        next_player: Option<String>,
    },
    Hint {
        line: LineRef,
        completes_box: bool,
    },
    GameOver {
        rankings: Vec<Ranking>,
        winners: Vec<String>,
        is_draw: bool,
        round_count: u32,
    },
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

pub struct DotsAndBoxes;

/// Fails unless `conn` holds the turn.
fn turn_holder(room: &Room<DotsAndBoxes>, conn: ConnectionId) -> Result<usize, MoveError> {
    let index = room.index_of(conn).ok_or(MoveError::NotAPlayer)?;
    if index != room.board.turn {
        return Err(MoveError::NotYourTurn);
    }
    Ok(index)
}

fn name_at(room: &Room<DotsAndBoxes>, index: usize) -> Option<String> {
    room.players.get(index).map(|p| p.display_name.clone())
}

/// Seats sorted by score, highest first; join order breaks ties.
pub fn rankings(room: &Room<DotsAndBoxes>) -> Vec<Ranking> {
    let total = room.board.total_boxes.max(1) as f64;
    let mut out: Vec<Ranking> = room
        .players
        .iter()
        .map(|p| Ranking {
            name: p.display_name.clone(),
            score: p.role.score,
            percentage: (f64::from(p.role.score) * 100.0 / total).round() as u32,
        })
        .collect();
    out.sort_by(|a, b| b.score.cmp(&a.score));
    out
}

impl GameEngine for DotsAndBoxes {
    type Config = DotsConfig;
    type Board = DotsBoard;
    type Role = DotsSeat;
    type Move = LineRef;
    type Event = DotsEvent;

    const KIND: GameKind = GameKind::DotsAndBoxes;

    fn limits(config: &DotsConfig) -> RoomLimits {
        RoomLimits::new(2, config.max_players.min(MAX_PLAYERS))
    }

    fn new_board(config: &DotsConfig) -> DotsBoard {
        DotsBoard::new(config.grid.dots(), 0)
    }

    fn seat(room: &mut Room<Self>, _conn: ConnectionId) -> DotsSeat {
        let color = PALETTE
            .iter()
            .copied()
            .find(|c| room.players.iter().all(|p| p.role.color != *c))
            .unwrap_or(PALETTE[room.players.len() % PALETTE.len()]);
        DotsSeat { color, score: 0 }
    }

    fn decode_move(request: MoveRequest) -> Result<LineRef, MoveError> {
        match request {
            MoveRequest::Line(line) => Ok(line),
            _ => Err(MoveError::Unsupported),
        }
    }

    fn apply_move(room: &mut Room<Self>, sender: ConnectionId, line: LineRef) -> Result<Outbox<Self>, MoveError> {
        let index = turn_holder(room, sender)?;
        match room.board.slot(line) {
            None => return Err(MoveError::OutOfRange),
            Some(Some(_)) => return Err(MoveError::LineTaken),
            Some(None) => {}
        }

        let player = &room.players[index];
        let stroke = Stroke {
            player: player.display_name.clone(),
            color: player.role.color,
        };
        let player_name = stroke.player.clone();

        let board = &mut room.board;
        if let Some(slot) = board.slot_mut(line) {
            *slot = Some(stroke.clone());
        }
        let mut closed = Vec::new();
        for b in board.adjacent_boxes(line) {
            // A box is only ever closed once.
            if board.boxes[b.row][b.col].is_none() && board.sides_drawn(b) == 4 {
                board.boxes[b.row][b.col] = Some(stroke.clone());
                closed.push(b);
            }
        }
        board.completed += closed.len();
        board.last_move = Some(LastMove {
            player: player_name.clone(),
            line,
            completed_boxes: closed.len(),
        });
        let extra_turn = !closed.is_empty();
        if !extra_turn {
            board.turn = (index + 1) % room.players.len();
        }

        let seat = &mut room.players[index].role;
        seat.score += closed.len() as u32;
        let new_score = seat.score;

        Ok(vec![(
            Recipient::All,
            DotsEvent::LineDrawn {
                player_name,
                line,
                completed_boxes: closed,
                new_score,
                extra_turn,
                next_player: name_at(room, room.board.turn),
            },
        )])
    }

    fn check_end(room: &Room<Self>) -> Option<RoundEnd> {
        let board = &room.board;
        if board.completed < board.total_boxes {
            return None;
        }
        let top = room.players.iter().map(|p| p.role.score).max().unwrap_or(0);
        let winners: Vec<ConnectionId> = room
            .players
            .iter()
            .filter(|p| p.role.score == top)
            .map(|p| p.conn)
            .collect();
        let shared = winners.len() > 1;
        let standings = room
            .players
            .iter()
            .map(|p| {
                let outcome = match (p.role.score == top, shared) {
                    (true, false) => Outcome::Win,
                    (true, true) => Outcome::Tie,
                    (false, _) => Outcome::Loss,
                };
                (p.conn, outcome)
            })
            .collect();
        Some(RoundEnd {
            reason: if shared { EndReason::Draw } else { EndReason::BoardComplete },
            winners,
            standings,
        })
    }

    fn announce_end(room: &Room<Self>, end: &RoundEnd) -> Outbox<Self> {
        vec![(
            Recipient::All,
            DotsEvent::GameOver {
                rankings: rankings(room),
                winners: end.winners.iter().map(|c| room.name_of(*c).to_string()).collect(),
                is_draw: end.winners.len() > 1,
                round_count: room.round_count,
            },
        )]
    }

    fn reset(room: &mut Room<Self>) {
        // The opening move rotates through the seats round by round.
        let starter = match room.players.len() {
            0 => 0,
            n => room.round_count as usize % n,
        };
        room.board = DotsBoard::new(room.config.grid.dots(), starter);
        for player in &mut room.players {
            player.role.score = 0;
        }
    }

    fn on_player_left(room: &mut Room<Self>, departed: &Player<DotsSeat>, index: usize) -> Outbox<Self> {
        let board = &mut room.board;
        if index < board.turn {
            board.turn -= 1;
        }
        if board.turn >= room.players.len() {
            board.turn = 0;
        }
        tracing::debug!(
            room_id = %room.code,
            departed = %departed.display_name,
            turn = room.board.turn,
            "turn repaired after departure"
        );
        Vec::new()
    }

    fn next_starter(room: &Room<Self>) -> Option<String> {
        name_at(room, room.board.turn)
    }

    fn skip_turn(room: &mut Room<Self>, conn: ConnectionId) -> Result<Outbox<Self>, MoveError> {
        let index = turn_holder(room, conn)?;
        room.board.turn = (index + 1) % room.players.len();
        Ok(vec![(
            Recipient::All,
            DotsEvent::TurnSkipped {
                player_name: room.players[index].display_name.clone(),
                next_player: name_at(room, room.board.turn),
            },
        )])
    }

    fn hint(room: &Room<Self>, conn: ConnectionId) -> Result<Outbox<Self>, MoveError> {
        turn_holder(room, conn)?;
        let board = &room.board;
        let free = board.free_lines();
        let closing: Vec<LineRef> = free.iter().copied().filter(|l| board.would_complete(*l) > 0).collect();
        let safe: Vec<LineRef> = free.iter().copied().filter(|l| !board.gives_away(*l)).collect();

        let mut rng = rand::rng();
        let (line, completes_box) = if let Some(line) = closing.choose(&mut rng) {
            (*line, true)
        } else if let Some(line) = safe.choose(&mut rng) {
            (*line, false)
        } else {
            (*free.choose(&mut rng).ok_or(MoveError::NotActive)?, false)
        };
        Ok(vec![(Recipient::Only(conn), DotsEvent::Hint { line, completes_box })])
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hangout_protocol::RoomCode;
    use hangout_room::RoomConfig;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn h(row: usize, col: usize) -> LineRef {
        LineRef { orientation: Orientation::Horizontal, row, col }
    }

    fn v(row: usize, col: usize) -> LineRef {
        LineRef { orientation: Orientation::Vertical, row, col }
    }

    fn room(grid: GridSize, players: &[(u64, &str)]) -> Room<DotsAndBoxes> {
        let code = RoomCode::parse("d1").unwrap();
        let config = DotsConfig { grid, ..DotsConfig::default() };
        let mut room = Room::new(code, config, &RoomConfig::default());
        for (id, name) in players {
            let seat = DotsAndBoxes::seat(&mut room, conn(*id));
            room.players.push(Player {
                conn: conn(*id),
                display_name: (*name).into(),
                role: seat,
                joined_at: 0,
            });
        }
        room
    }

    /// Draws a line directly, bypassing turn order.
    fn draw_free(room: &mut Room<DotsAndBoxes>, line: LineRef) {
        *room.board.slot_mut(line).unwrap() = Some(Stroke { player: "setup".into(), color: PALETTE[7] });
    }

    #[test]
    fn test_board_shape_per_grid() {
        for (grid, dots) in [(GridSize::Small, 3), (GridSize::Medium, 4), (GridSize::Large, 5), (GridSize::Huge, 6)] {
            let board = DotsBoard::new(grid.dots(), 0);
            assert_eq!(board.horizontal.len(), dots);
            assert_eq!(board.horizontal[0].len(), dots - 1);
            assert_eq!(board.vertical.len(), dots - 1);
            assert_eq!(board.vertical[0].len(), dots);
            assert_eq!(board.total_boxes, (dots - 1) * (dots - 1));
            assert_eq!(board.free_lines().len(), 2 * dots * (dots - 1));
        }
    }

    #[test]
    fn test_colours_first_free() {
        let mut room = room(GridSize::Medium, &[(1, "A"), (2, "B"), (3, "C")]);
        assert_eq!(room.players[1].role.color, PALETTE[1]);
        room.players.remove(1);
        assert_eq!(DotsAndBoxes::seat(&mut room, conn(4)).color, PALETTE[1]);
    }

    #[test]
    fn test_rejects_out_of_turn_taken_and_out_of_range() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        assert_eq!(DotsAndBoxes::apply_move(&mut room, conn(2), h(0, 0)), Err(MoveError::NotYourTurn));
        assert_eq!(DotsAndBoxes::apply_move(&mut room, conn(1), h(3, 0)), Err(MoveError::OutOfRange));
        assert_eq!(DotsAndBoxes::apply_move(&mut room, conn(1), v(0, 3)), Err(MoveError::OutOfRange));

        DotsAndBoxes::apply_move(&mut room, conn(1), h(0, 0)).unwrap();
        assert_eq!(DotsAndBoxes::apply_move(&mut room, conn(2), h(0, 0)), Err(MoveError::LineTaken));
        assert_eq!(room.board.turn, 1);
    }

    #[test]
    fn test_empty_move_rotates_turn() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B"), (3, "C")]);
        let out = DotsAndBoxes::apply_move(&mut room, conn(1), h(0, 0)).unwrap();
        assert_eq!(room.board.turn, 1);
        match &out[0].1 {
            DotsEvent::LineDrawn { extra_turn, next_player, completed_boxes, .. } => {
                assert!(!extra_turn);
                assert!(completed_boxes.is_empty());
                assert_eq!(next_player.as_deref(), Some("B"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        DotsAndBoxes::apply_move(&mut room, conn(2), h(0, 1)).unwrap();
        DotsAndBoxes::apply_move(&mut room, conn(3), h(2, 1)).unwrap();
        assert_eq!(room.board.turn, 0);
    }

    #[test]
    fn test_closing_two_boxes_keeps_turn() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        // Two top boxes with everything drawn except the shared middle side.
        for line in [h(0, 0), h(1, 0), v(0, 0), h(0, 1), h(1, 1), v(0, 2)] {
            draw_free(&mut room, line);
        }
        let out = DotsAndBoxes::apply_move(&mut room, conn(1), v(0, 1)).unwrap();
        assert_eq!(room.board.turn, 0);
        assert_eq!(room.board.completed, 2);
        assert_eq!(room.players[0].role.score, 2);
        match &out[0].1 {
            DotsEvent::LineDrawn { extra_turn, new_score, completed_boxes, .. } => {
                assert!(extra_turn);
                assert_eq!(*new_score, 2);
                assert_eq!(completed_boxes.len(), 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_scores_accumulate_per_box() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        for line in [h(0, 0), h(1, 0), v(0, 0)] {
            draw_free(&mut room, line);
        }
        DotsAndBoxes::apply_move(&mut room, conn(1), v(0, 1)).unwrap();
        assert_eq!(room.board.completed, 1);
        draw_free(&mut room, h(0, 1));
        draw_free(&mut room, h(1, 1));
        DotsAndBoxes::apply_move(&mut room, conn(1), v(0, 2)).unwrap();
        assert_eq!(room.board.completed, 2);
        assert_eq!(room.players[0].role.score, 2);
    }

    #[test]
    fn test_full_board_ranks_players() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        room.board.completed = 4;
        room.players[0].role.score = 3;
        room.players[1].role.score = 1;
        let end = DotsAndBoxes::check_end(&room).unwrap();
        assert_eq!(end.reason, EndReason::BoardComplete);
        assert_eq!(end.winners, vec![conn(1)]);

        let ranks = rankings(&room);
        assert_eq!(ranks[0], Ranking { name: "A".into(), score: 3, percentage: 75 });
        assert_eq!(ranks[1].percentage, 25);
    }

    #[test]
    fn test_equal_top_scores_are_a_draw() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B"), (3, "C")]);
        room.board.completed = 4;
        room.players[0].role.score = 2;
        room.players[2].role.score = 2;
        let end = DotsAndBoxes::check_end(&room).unwrap();
        assert_eq!(end.reason, EndReason::Draw);
        assert_eq!(end.winners, vec![conn(1), conn(3)]);
        assert!(end.standings.contains(&(conn(1), Outcome::Tie)));
        assert!(end.standings.contains(&(conn(2), Outcome::Loss)));
    }

    #[test]
    fn test_skip_turn_only_for_turn_holder() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        assert_eq!(DotsAndBoxes::skip_turn(&mut room, conn(2)), Err(MoveError::NotYourTurn));
        let out = DotsAndBoxes::skip_turn(&mut room, conn(1)).unwrap();
        assert_eq!(room.board.turn, 1);
        assert!(matches!(&out[0].1, DotsEvent::TurnSkipped { next_player: Some(n), .. } if n == "B"));
    }

    #[test]
    fn test_hint_prefers_closing_line() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        for line in [h(0, 0), h(1, 0), v(0, 0)] {
            draw_free(&mut room, line);
        }
        let out = DotsAndBoxes::hint(&room, conn(1)).unwrap();
        assert_eq!(out[0].0, Recipient::Only(conn(1)));
        assert_eq!(out[0].1, DotsEvent::Hint { line: v(0, 1), completes_box: true });
    }

    #[test]
    fn test_hint_avoids_giving_boxes_away() {
        let room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        let out = DotsAndBoxes::hint(&room, conn(1)).unwrap();
        match &out[0].1 {
            DotsEvent::Hint { line, completes_box } => {
                assert!(!completes_box);
                assert!(!room.board.is_drawn(*line));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(DotsAndBoxes::hint(&room, conn(2)).is_err());
    }

    #[test]
    fn test_departure_keeps_turn_valid() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B"), (3, "C")]);
        room.board.turn = 2;
        let gone = room.players.remove(2);
        DotsAndBoxes::on_player_left(&mut room, &gone, 2);
        assert_eq!(room.board.turn, 0);

        let mut room = room_at_turn(1);
        let gone = room.players.remove(0);
        DotsAndBoxes::on_player_left(&mut room, &gone, 0);
        assert_eq!(room.board.turn, 0);
        assert_eq!(room.players[room.board.turn].display_name, "B");
    }

    fn room_at_turn(turn: usize) -> Room<DotsAndBoxes> {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B"), (3, "C")]);
        room.board.turn = turn;
        room
    }

    #[test]
    fn test_reset_rotates_starter_and_clears_scores() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        room.players[0].role.score = 3;
        room.round_count = 1;
        DotsAndBoxes::reset(&mut room);
        assert_eq!(room.board, DotsBoard::new(3, 1));
        assert_eq!(room.players[0].role.score, 0);
        assert_eq!(DotsAndBoxes::next_starter(&room).as_deref(), Some("B"));
    }

    #[test]
    fn test_line_drawn_event_shape() {
        let mut room = room(GridSize::Small, &[(1, "A"), (2, "B")]);
        let out = DotsAndBoxes::apply_move(&mut room, conn(1), v(1, 2)).unwrap();
        let value = serde_json::to_value(&out[0].1).unwrap();
        assert_eq!(value["event"], "line-drawn");
        assert_eq!(value["data"]["playerName"], "A");
        assert_eq!(value["data"]["line"]["orientation"], "vertical");
        assert_eq!(value["data"]["extraTurn"], false);
    }
}
