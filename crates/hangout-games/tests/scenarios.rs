//! Whole-game scenarios: each engine driven through the room session, and
//! through a live room actor where timers matter.

use std::time::Duration;

use hangout_games::{
    Bingo, BingoConfig, CardSize, DotsAndBoxes, DotsConfig, GridSize, Mark, TicTacToe,
    TicTacToeBoard, TicTacToeConfig,
};
use hangout_protocol::{ConnectionId, LineRef, MoveRequest, Orientation, RoomCode};
use hangout_room::{
    Action, Effect, EndReason, GameEngine, MoveError, Notice, Outbound, Room, RoomConfig,
    RoomError, RoomSession, RoomStatus, RoomStore, TimerOp,
};
use hangout_session::StatsTracker;
use serde_json::Value;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).unwrap()
}

fn session<E: GameEngine>(config: E::Config) -> (RoomSession<E>, StatsTracker) {
    let settings = RoomConfig::default();
    let stats = StatsTracker::new();
    let room = Room::new(code("R1"), config, &settings);
    (RoomSession::new(room, stats.clone(), settings), stats)
}

fn events<E: GameEngine>(fx: &[Effect<E>]) -> Vec<Value> {
    fx.iter()
        .filter_map(|e| match e {
            Effect::Send(_, Notice::Room(event)) => serde_json::to_value(event).ok(),
            Effect::Send(_, Notice::Game(event)) => serde_json::to_value(event).ok(),
            _ => None,
        })
        .collect()
}

fn find<E: GameEngine>(fx: &[Effect<E>], name: &str) -> Option<Value> {
    events(fx).into_iter().find(|v| v["event"] == name)
}

fn cell(s: &mut RoomSession<TicTacToe>, who: u64, index: usize) -> Result<Vec<Effect<TicTacToe>>, RoomError> {
    s.act(conn(who), Action::Move(MoveRequest::Cell(index)))
}

fn line(orientation: Orientation, row: usize, col: usize) -> MoveRequest {
    MoveRequest::Line(LineRef { orientation, row, col })
}

// =========================================================================
// Tic-tac-toe
// =========================================================================

#[test]
fn test_tictactoe_top_row_win() {
    let (mut s, stats) = session::<TicTacToe>(TicTacToeConfig::default());
    s.join(conn(1), "A").unwrap();
    assert_eq!(s.room().status, RoomStatus::Waiting);
    s.join(conn(2), "B").unwrap();
    assert_eq!(s.room().status, RoomStatus::Playing);
    assert_eq!(s.room().players[0].role, Mark::X);
    assert_eq!(s.room().players[1].role, Mark::O);

    for (who, index) in [(1, 0), (2, 3), (1, 1), (2, 4)] {
        cell(&mut s, who, index).unwrap();
    }
    let fx = cell(&mut s, 1, 2).unwrap();

    let over = find(&fx, "game-over").unwrap();
    assert_eq!(over["data"]["winner"], "A");
    assert_eq!(over["data"]["line"], serde_json::json!([0, 1, 2]));
    assert_eq!(s.room().status, RoomStatus::Finished);
    assert_eq!(s.room().round_count, 1);

    let a = stats.get(conn(1)).unwrap();
    assert_eq!((a.wins, a.current_streak), (1, 1));
    let b = stats.get(conn(2)).unwrap();
    assert_eq!((b.losses, b.current_streak), (1, 0));
    assert!(fx.iter().any(|e| matches!(e, Effect::Timer(TimerOp::ScheduleNextRound(_)))));
}

#[test]
fn test_tictactoe_third_player_rejected() {
    let (mut s, _) = session::<TicTacToe>(TicTacToeConfig::default());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();
    let err = s.join(conn(3), "C").unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(_)));
    assert_eq!(s.room().players.len(), 2);
}

#[test]
fn test_tictactoe_reset_gives_fresh_board_and_keeps_round_count() {
    let (mut s, _) = session::<TicTacToe>(TicTacToeConfig::default());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();
    for (who, index) in [(1, 0), (2, 3), (1, 1), (2, 4), (1, 2)] {
        cell(&mut s, who, index).unwrap();
    }
    let fx = s.act(conn(2), Action::NextGame).unwrap();

    assert_eq!(s.room().round_count, 1);
    // Second round: O opens.
    assert_eq!(s.room().board, TicTacToeBoard::new(Mark::O));
    let reset = find(&fx, "game-reset").unwrap();
    assert_eq!(reset["data"]["roundCount"], 1);
    assert_eq!(reset["data"]["nextStarter"], "B");

    assert!(matches!(
        cell(&mut s, 1, 4),
        Err(RoomError::Move(MoveError::NotYourTurn))
    ));
    assert!(cell(&mut s, 2, 4).is_ok());
}

#[test]
fn test_tictactoe_draw_records_ties() {
    let (mut s, stats) = session::<TicTacToe>(TicTacToeConfig::default());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();
    // X O X / X O X / O X O
    for (who, index) in [(1, 0), (2, 1), (1, 2), (2, 4), (1, 3), (2, 6), (1, 5), (2, 8), (1, 7)] {
        cell(&mut s, who, index).unwrap();
    }
    assert_eq!(s.room().status, RoomStatus::Finished);
    assert_eq!(s.room().history.last().unwrap().reason, EndReason::Draw);
    assert_eq!(stats.get(conn(1)).unwrap().ties, 1);
    assert_eq!(stats.get(conn(2)).unwrap().ties, 1);
}

#[test]
fn test_tictactoe_departure_returns_to_waiting() {
    let (mut s, _) = session::<TicTacToe>(TicTacToeConfig::default());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();
    cell(&mut s, 1, 4).unwrap();
    s.leave(conn(1)).unwrap();
    assert_eq!(s.room().status, RoomStatus::Waiting);

    s.join(conn(3), "C").unwrap();
    assert_eq!(s.room().status, RoomStatus::Playing);
    assert_eq!(s.room().players[1].role, Mark::X);
    assert!(s.room().board.cells.iter().all(Option::is_none));
}

// =========================================================================
// Bingo
// =========================================================================

fn solo_small() -> BingoConfig {
    BingoConfig {
        size: CardSize::Small,
        min_players: 1,
        ..BingoConfig::default()
    }
}

#[test]
fn test_bingo_full_house_solo() {
    let (mut s, stats) = session::<Bingo>(solo_small());
    s.join(conn(1), "Caller").unwrap();
    assert_eq!(s.room().status, RoomStatus::Playing);

    let mut numbers: Vec<u32> = s.room().players[0]
        .role
        .squares
        .iter()
        .filter_map(|sq| sq.number)
        .collect();
    numbers.reverse();
    assert_eq!(numbers.len(), 9);

    let last = numbers.pop().unwrap();
    for n in numbers {
        s.act(conn(1), Action::Move(MoveRequest::Number(n))).unwrap();
        assert_eq!(s.room().status, RoomStatus::Playing);
    }
    let fx = s.act(conn(1), Action::Move(MoveRequest::Number(last))).unwrap();

    assert_eq!(s.room().status, RoomStatus::Finished);
    let finished = find(&fx, "game-finished").unwrap();
    assert_eq!(finished["data"]["reason"], "full-house");
    assert_eq!(finished["data"]["winners"][0], "Caller");
    assert_eq!(stats.get(conn(1)).unwrap().wins, 1);
    // Bingo does not continue on its own.
    assert!(!fx.iter().any(|e| matches!(e, Effect::Timer(TimerOp::ScheduleNextRound(_)))));
}

#[test]
fn test_bingo_second_call_of_same_number_rejected() {
    let (mut s, _) = session::<Bingo>(solo_small());
    s.join(conn(1), "Caller").unwrap();
    s.act(conn(1), Action::Move(MoveRequest::Number(7))).unwrap();
    let err = s.act(conn(1), Action::Move(MoveRequest::Number(7))).unwrap_err();
    assert!(matches!(err, RoomError::Move(MoveError::AlreadyCalled(7))));
    assert_eq!(s.room().board.called, vec![7]);
}

#[test]
fn test_bingo_only_caller_resets() {
    let (mut s, _) = session::<Bingo>(BingoConfig::default());
    s.join(conn(1), "Ana").unwrap();
    s.join(conn(2), "Bo").unwrap();
    let err = s.act(conn(2), Action::Reset).unwrap_err();
    assert!(matches!(err, RoomError::Move(MoveError::NotCaller)));
    assert!(s.act(conn(1), Action::Reset).is_ok());
}

#[test]
fn test_bingo_caller_departure_reassigns_and_stops_auto_caller() {
    let (mut s, _) = session::<Bingo>(BingoConfig::default());
    for (id, name) in [(1, "Ana"), (2, "Bo"), (3, "Cy")] {
        s.join(conn(id), name).unwrap();
    }
    s.act(conn(1), Action::ToggleAutoPlay).unwrap();
    assert!(s.autoplay());

    let fx = s.leave(conn(1)).unwrap();
    assert!(!s.autoplay());
    assert_eq!(s.room().board.caller, Some(conn(2)));
    let changed = find(&fx, "caller-changed").unwrap();
    assert_eq!(changed["data"]["caller"], "Bo");
    // Still enough players: the round goes on.
    assert_eq!(s.room().status, RoomStatus::Playing);
}

#[test]
fn test_bingo_takeover_keeps_caller_seat() {
    let (mut s, _) = session::<Bingo>(BingoConfig::default());
    s.join(conn(1), "Ana").unwrap();
    s.join(conn(2), "Bo").unwrap();
    let card = s.room().players[0].role.clone();

    let joined = s.join(conn(9), "Ana").unwrap();
    assert!(joined.reconnected);
    assert_eq!(s.room().board.caller, Some(conn(9)));
    assert_eq!(s.room().players[0].role, card);
    assert!(s.act(conn(9), Action::Move(MoveRequest::Number(1))).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_bingo_auto_caller_calls_on_its_own() {
    let mut store: RoomStore<Bingo> = RoomStore::new(RoomConfig::default(), StatsTracker::new());
    let config = BingoConfig {
        auto_call_ms: 2_000,
        ..BingoConfig::default()
    };
    let room = store.get_or_create(&code("auto"), config);
    let (tx, mut rx) = mpsc::unbounded_channel();
    room.join(conn(1), "Ana", tx).await.unwrap();
    room.join(conn(2), "Bo", mpsc::unbounded_channel().0).await.unwrap();

    let err = room.act(conn(2), Action::ToggleAutoPlay).await.unwrap_err();
    assert!(matches!(err, RoomError::Move(MoveError::NotCaller)));
    room.act(conn(1), Action::ToggleAutoPlay).await.unwrap();

    let mut calls = Vec::new();
    while calls.len() < 3 {
        let Some(Outbound::Frame(bytes)) = rx.recv().await else {
            panic!("room went away");
        };
        let frame: Value = serde_json::from_slice(&bytes).unwrap();
        if frame["payload"]["event"] == "number-called" {
            assert_eq!(frame["payload"]["data"]["auto"], true);
            calls.push(frame["payload"]["data"]["number"].as_u64().unwrap());
        }
    }
    calls.sort_unstable();
    calls.dedup();
    assert_eq!(calls.len(), 3, "auto caller never repeats a number");

    room.act(conn(1), Action::ToggleAutoPlay).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    // Nothing but already queued frames; no further calls arrive.
    let mut extra = 0;
    while let Ok(Outbound::Frame(bytes)) = rx.try_recv() {
        let frame: Value = serde_json::from_slice(&bytes).unwrap();
        if frame["payload"]["event"] == "number-called" {
            extra += 1;
        }
    }
    assert_eq!(extra, 0);
}

// =========================================================================
// Dots-and-boxes
// =========================================================================

fn small_dots() -> DotsConfig {
    DotsConfig {
        grid: GridSize::Small,
        ..DotsConfig::default()
    }
}

#[test]
fn test_dots_full_game_two_players() {
    use Orientation::{Horizontal as H, Vertical as V};

    let (mut s, stats) = session::<DotsAndBoxes>(small_dots());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();

    // A and B alternate on lines that close nothing.
    let opening = [
        (1, H, 0, 0),
        (2, H, 0, 1),
        (1, H, 2, 0),
        (2, H, 2, 1),
        (1, V, 0, 0),
        (2, V, 1, 0),
        (1, V, 0, 2),
        (2, V, 1, 2),
    ];
    for (who, o, r, c) in opening {
        s.act(conn(who), Action::Move(line(o, r, c))).unwrap();
    }
    assert_eq!(s.room().board.turn, 0);

    // A's middle horizontal line closes nothing; B then sweeps.
    s.act(conn(1), Action::Move(line(H, 1, 0))).unwrap();
    assert_eq!(s.room().board.turn, 1);
    s.act(conn(2), Action::Move(line(V, 0, 1))).unwrap();
    assert_eq!(s.room().board.turn, 1, "closing a box keeps the turn");
    assert_eq!(s.room().players[1].role.score, 1);

    s.act(conn(2), Action::Move(line(H, 1, 1))).unwrap();
    assert_eq!(s.room().board.turn, 1);
    assert_eq!(s.room().players[1].role.score, 2);

    // The last line closes both bottom boxes at once.
    let fx = s.act(conn(2), Action::Move(line(V, 1, 1))).unwrap();
    let drawn = find(&fx, "line-drawn").unwrap();
    assert_eq!(drawn["data"]["completedBoxes"].as_array().unwrap().len(), 2);
    assert_eq!(drawn["data"]["extraTurn"], true);

    assert_eq!(s.room().status, RoomStatus::Finished);
    let over = find(&fx, "game-over").unwrap();
    assert_eq!(over["data"]["winners"][0], "B");
    assert_eq!(over["data"]["isDraw"], false);
    assert_eq!(over["data"]["rankings"][0]["score"], 4);
    assert_eq!(over["data"]["rankings"][0]["percentage"], 100);
    assert_eq!(stats.get(conn(2)).unwrap().wins, 1);
    assert_eq!(stats.get(conn(1)).unwrap().losses, 1);
}

#[test]
fn test_dots_skip_and_hint_through_session() {
    let (mut s, _) = session::<DotsAndBoxes>(small_dots());
    s.join(conn(1), "A").unwrap();
    s.join(conn(2), "B").unwrap();

    let fx = s.act(conn(1), Action::Hint).unwrap();
    assert!(matches!(fx.as_slice(), [Effect::Send(to, _)] if *to == hangout_protocol::Recipient::Only(conn(1))));
    assert!(find(&fx, "hint").is_some());

    let err = s.act(conn(2), Action::SkipTurn).unwrap_err();
    assert!(matches!(err, RoomError::Move(MoveError::NotYourTurn)));
    let fx = s.act(conn(1), Action::SkipTurn).unwrap();
    assert_eq!(s.room().board.turn, 1);
    assert!(find(&fx, "turn-skipped").is_some());
    assert!(find(&fx, "game-state").is_some());
}

#[test]
fn test_dots_turn_holder_departure_passes_turn() {
    let (mut s, _) = session::<DotsAndBoxes>(small_dots());
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        s.join(conn(id), name).unwrap();
    }
    s.act(conn(1), Action::Move(line(Orientation::Horizontal, 0, 0))).unwrap();
    // B holds the turn and leaves; C is next.
    s.leave(conn(2)).unwrap();
    assert_eq!(s.room().status, RoomStatus::Playing);
    let turn = s.room().board.turn;
    assert_eq!(s.room().players[turn].display_name, "C");
    assert!(s.act(conn(3), Action::Move(line(Orientation::Horizontal, 0, 1))).is_ok());
}
