//! Tic-tac-toe: two players, a 3×3 board, X and O.

use hangout_protocol::{ConnectionId, GameKind, MoveRequest, Recipient};
use hangout_room::{
    EndReason, GameEngine, MoveError, Outbox, Player, Room, RoomLimits, RoundEnd,
};
use hangout_session::Outcome;
use serde::{Deserialize, Serialize};

/// Rows, columns, then the two diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// Tic-tac-toe has no variants; any options are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicTacToeConfig {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicTacToeBoard {
    /// Row-major, `None` for an empty cell.
    pub cells: [Option<Mark>; 9],
    /// The mark that moves next.
    pub turn: Mark,
    /// The mark that opened this round.
    pub starter: Mark,
    /// Set once a line of three is completed.
    pub winning_line: Option<[usize; 3]>,
}

impl TicTacToeBoard {
    pub fn new(starter: Mark) -> Self {
        Self {
            cells: [None; 9],
            turn: starter,
            starter,
            winning_line: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum TicTacToeEvent {
    TurnChange {
        cell: usize,
        mark: Mark,
        next_turn: Mark,
        next_player: Option<String>,
    },
    GameOver {
        winner: Option<String>,
        mark: Option<Mark>,
        line: Option<[usize; 3]>,
        is_draw: bool,
        round_count: u32,
    },
}

/// Returns the winning mark and line, if any.
pub fn winner(cells: &[Option<Mark>; 9]) -> Option<(Mark, [usize; 3])> {
    WIN_LINES.iter().find_map(|line| {
        let [a, b, c] = *line;
        match cells[a] {
            Some(mark) if cells[b] == Some(mark) && cells[c] == Some(mark) => Some((mark, *line)),
            _ => None,
        }
    })
}

/// The mark that opens a round, alternating with every finished round.
fn starter_for(round_count: u32) -> Mark {
    if round_count % 2 == 0 { Mark::X } else { Mark::O }
}

fn holder(room: &Room<TicTacToe>, mark: Mark) -> Option<&Player<Mark>> {
    room.players.iter().find(|p| p.role == mark)
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

pub struct TicTacToe;

impl GameEngine for TicTacToe {
    type Config = TicTacToeConfig;
    type Board = TicTacToeBoard;
    type Role = Mark;
    type Move = usize;
    type Event = TicTacToeEvent;

    const KIND: GameKind = GameKind::TicTacToe;

    fn limits(_config: &TicTacToeConfig) -> RoomLimits {
        RoomLimits::new(2, 2)
    }

    fn new_board(_config: &TicTacToeConfig) -> TicTacToeBoard {
        TicTacToeBoard::new(Mark::X)
    }

    fn seat(room: &mut Room<Self>, _conn: ConnectionId) -> Mark {
        // Someone may have left X free while O stayed.
        if holder(room, Mark::X).is_some() { Mark::O } else { Mark::X }
    }

    fn decode_move(request: MoveRequest) -> Result<usize, MoveError> {
        match request {
            MoveRequest::Cell(cell) => Ok(cell),
            _ => Err(MoveError::Unsupported),
        }
    }

    fn apply_move(room: &mut Room<Self>, sender: ConnectionId, cell: usize) -> Result<Outbox<Self>, MoveError> {
        let mark = room.player(sender).ok_or(MoveError::NotAPlayer)?.role;
        let board = &room.board;
        if mark != board.turn {
            return Err(MoveError::NotYourTurn);
        }
        if cell >= board.cells.len() {
            return Err(MoveError::OutOfRange);
        }
        if board.cells[cell].is_some() {
            return Err(MoveError::CellOccupied);
        }

        room.board.cells[cell] = Some(mark);
        if let Some((_, line)) = winner(&room.board.cells) {
            room.board.winning_line = Some(line);
            return Ok(Vec::new());
        }
        if room.board.is_full() {
            return Ok(Vec::new());
        }

        let next = mark.other();
        room.board.turn = next;
        let next_player = holder(room, next).map(|p| p.display_name.clone());
        Ok(vec![(
            Recipient::All,
            TicTacToeEvent::TurnChange {
                cell,
                mark,
                next_turn: next,
                next_player,
            },
        )])
    }

    fn check_end(room: &Room<Self>) -> Option<RoundEnd> {
        if let Some((mark, _)) = winner(&room.board.cells) {
            let winners: Vec<ConnectionId> = holder(room, mark).map(|p| p.conn).into_iter().collect();
            let standings = room
                .players
                .iter()
                .map(|p| {
                    let outcome = if p.role == mark { Outcome::Win } else { Outcome::Loss };
                    (p.conn, outcome)
                })
                .collect();
            return Some(RoundEnd {
                reason: EndReason::Win,
                winners,
                standings,
            });
        }
        if room.board.is_full() {
            return Some(RoundEnd {
                reason: EndReason::Draw,
                winners: Vec::new(),
                standings: room.conns().map(|c| (c, Outcome::Tie)).collect(),
            });
        }
        None
    }

    fn announce_end(room: &Room<Self>, end: &RoundEnd) -> Outbox<Self> {
        let won = winner(&room.board.cells);
        let event = TicTacToeEvent::GameOver {
            winner: end.winners.first().map(|c| room.name_of(*c).to_string()),
            mark: won.map(|(mark, _)| mark),
            line: won.map(|(_, line)| line),
            is_draw: end.reason == EndReason::Draw,
            round_count: room.round_count,
        };
        vec![(Recipient::All, event)]
    }

    fn reset(room: &mut Room<Self>) {
        room.board = TicTacToeBoard::new(starter_for(room.round_count));
    }

    fn on_player_left(room: &mut Room<Self>, departed: &Player<Mark>, _index: usize) -> Outbox<Self> {
        // The room drops back to waiting; the next opponent starts clean.
        tracing::debug!(room_id = %room.code, mark = ?departed.role, "clearing board after departure");
        Self::reset(room);
        Vec::new()
    }

    fn auto_continues() -> bool {
        true
    }

    fn next_starter(room: &Room<Self>) -> Option<String> {
        holder(room, room.board.starter).map(|p| p.display_name.clone())
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

    fn room_with_two() -> Room<TicTacToe> {
        let code = RoomCode::parse("t1").unwrap();
        let mut room = Room::new(code, TicTacToeConfig::default(), &RoomConfig::default());
        for (id, name) in [(1, "Ana"), (2, "Bo")] {
            let role = TicTacToe::seat(&mut room, conn(id));
            room.players.push(Player {
                conn: conn(id),
                display_name: name.into(),
                role,
                joined_at: 0,
            });
        }
        room
    }

    fn cells(marks: &str) -> [Option<Mark>; 9] {
        let mut out = [None; 9];
        for (i, ch) in marks.chars().enumerate() {
            out[i] = match ch {
                'X' => Some(Mark::X),
                'O' => Some(Mark::O),
                _ => None,
            };
        }
        out
    }

    #[test]
    fn test_seats_get_x_then_o() {
        let room = room_with_two();
        assert_eq!(room.players[0].role, Mark::X);
        assert_eq!(room.players[1].role, Mark::O);
    }

    #[test]
    fn test_top_row_wins_for_x() {
        assert_eq!(winner(&cells("XXX.OO...")), Some((Mark::X, [0, 1, 2])));
    }

    #[test]
    fn test_every_win_line_detected() {
        for line in WIN_LINES {
            let mut board = [None; 9];
            for i in line {
                board[i] = Some(Mark::O);
            }
            assert_eq!(winner(&board), Some((Mark::O, line)), "line {line:?}");
        }
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let mut room = room_with_two();
        room.board.cells = cells("XOXXOXOXO");
        let end = TicTacToe::check_end(&room).unwrap();
        assert_eq!(end.reason, EndReason::Draw);
        assert!(end.winners.is_empty());
        assert!(end.standings.iter().all(|(_, o)| *o == Outcome::Tie));
    }

    #[test]
    fn test_rejects_wrong_turn_and_occupied_cell() {
        let mut room = room_with_two();
        assert_eq!(TicTacToe::apply_move(&mut room, conn(2), 0), Err(MoveError::NotYourTurn));

        TicTacToe::apply_move(&mut room, conn(1), 4).unwrap();
        assert_eq!(TicTacToe::apply_move(&mut room, conn(2), 4), Err(MoveError::CellOccupied));
        assert_eq!(TicTacToe::apply_move(&mut room, conn(2), 9), Err(MoveError::OutOfRange));
        assert_eq!(room.board.cells[4], Some(Mark::X));
        assert_eq!(room.board.turn, Mark::O);
    }

    #[test]
    fn test_each_move_changes_one_cell() {
        let mut room = room_with_two();
        let before = room.board.cells;
        TicTacToe::apply_move(&mut room, conn(1), 8).unwrap();
        let changed = before.iter().zip(room.board.cells.iter()).filter(|(a, b)| a != b).count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_turn_change_names_next_player() {
        let mut room = room_with_two();
        let out = TicTacToe::apply_move(&mut room, conn(1), 0).unwrap();
        match &out[0].1 {
            TicTacToeEvent::TurnChange { next_turn, next_player, .. } => {
                assert_eq!(*next_turn, Mark::O);
                assert_eq!(next_player.as_deref(), Some("Bo"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_winning_move_records_line_and_no_turn_change() {
        let mut room = room_with_two();
        for (who, cell) in [(1, 0), (2, 3), (1, 1), (2, 4)] {
            TicTacToe::apply_move(&mut room, conn(who), cell).unwrap();
        }
        let out = TicTacToe::apply_move(&mut room, conn(1), 2).unwrap();
        assert!(out.is_empty());
        assert_eq!(room.board.winning_line, Some([0, 1, 2]));

        let end = TicTacToe::check_end(&room).unwrap();
        assert_eq!(end.winners, vec![conn(1)]);
        assert!(end.standings.contains(&(conn(2), Outcome::Loss)));
    }

    #[test]
    fn test_reset_alternates_starter() {
        let mut room = room_with_two();
        room.round_count = 1;
        TicTacToe::reset(&mut room);
        assert_eq!(room.board, TicTacToeBoard::new(Mark::O));
        assert_eq!(TicTacToe::next_starter(&room).as_deref(), Some("Bo"));

        room.round_count = 2;
        TicTacToe::reset(&mut room);
        assert_eq!(room.board.turn, Mark::X);
    }

    #[test]
    fn test_newcomer_takes_free_mark() {
        let mut room = room_with_two();
        let gone = room.players.remove(0);
        TicTacToe::on_player_left(&mut room, &gone, 0);
        assert_eq!(TicTacToe::seat(&mut room, conn(3)), Mark::X);
    }

    #[test]
    fn test_game_over_event_shape() {
        let event = TicTacToeEvent::GameOver {
            winner: Some("Ana".into()),
            mark: Some(Mark::X),
            line: Some([0, 1, 2]),
            is_draw: false,
            round_count: 1,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "game-over");
        assert_eq!(value["data"]["isDraw"], false);
        assert_eq!(value["data"]["mark"], "X");
        assert_eq!(value["data"]["roundCount"], 1);
    }
}
