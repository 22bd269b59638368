//! The three hangout games, each a [`GameEngine`] implementation.
//!
//! - [`TicTacToe`]: two players, alternating starter, automatic next round
//! - [`Bingo`]: one caller, a card per player, optional automatic caller
//! - [`DotsAndBoxes`]: up to eight players, extra turn per closed box
//!
//! Variant options arrive as free-form JSON in `join-room`; use
//! [`config_from_options`] to turn them into an engine's `Config`.

mod bingo;
mod dots;
mod tictactoe;

pub use bingo::{
    Bingo, BingoBoard, BingoCard, BingoConfig, BingoEvent, Call, CardSize, Pattern, PatternKind,
    Square, Winner,
};
pub use dots::{
    BoxRef, DotsAndBoxes, DotsBoard, DotsConfig, DotsEvent, DotsSeat, GridSize, LastMove, PALETTE,
    Ranking, Stroke, rankings,
};
pub use tictactoe::{Mark, TicTacToe, TicTacToeBoard, TicTacToeConfig, TicTacToeEvent, WIN_LINES, winner};

use hangout_room::GameEngine;
use serde_json::Value;

/// Decodes `join-room.options` into an engine config.
///
/// Missing options, and options that do not fit the engine, give the
/// default variant.
pub fn config_from_options<E: GameEngine>(options: Option<&Value>) -> E::Config {
    let Some(value) = options.filter(|v| !v.is_null()) else {
        return E::Config::default();
    };
    match serde_json::from_value(value.clone()) {
        Ok(config) => config,
        Err(err) => {
            tracing::debug!(game = %E::KIND, %err, "ignoring invalid room options");
            E::Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_decode_per_engine() {
        let bingo = config_from_options::<Bingo>(Some(&json!({ "size": "small" })));
        assert_eq!(bingo.size, CardSize::Small);

        let dots = config_from_options::<DotsAndBoxes>(Some(&json!({ "grid": "huge" })));
        assert_eq!(dots.grid, GridSize::Huge);
    }

    #[test]
    fn test_bad_options_fall_back_to_defaults() {
        let bingo = config_from_options::<Bingo>(Some(&json!({ "size": "gigantic" })));
        assert_eq!(bingo.size, CardSize::Medium);

        let dots = config_from_options::<DotsAndBoxes>(Some(&json!("not an object")));
        assert_eq!(dots.grid, GridSize::Medium);

        let dots = config_from_options::<DotsAndBoxes>(None);
        assert_eq!(dots.max_players, 8);

        let _ = config_from_options::<TicTacToe>(Some(&json!({ "anything": 1 })));
    }
}
