//! Wire payloads in the shapes the server sends

use gambit::models::Game;
use gambit::FromWire;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn user_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "elo": 1000 + id,
        "created_at": 1_600_000_000,
        "avatar_url": null
    })
}

/// A started, unfinished game; `host`/`away`/`invited` are whatever the
/// caller passes (embedded users, reference keys, or null)
pub fn game_with_players(id: i64, host: Value, away: Value, invited: Value) -> Value {
    json!({
        "id": id,
        "mode": 1,
        "host": host,
        "away": away,
        "invited": invited,
        "current_turn": 1,
        "turn_number": 0,
        "main_thinking_time": 600,
        "fixed_extra_time": 0,
        "time_increment_per_turn": 5,
        "host_time": 600,
        "away_time": 600,
        "host_offering_draw": false,
        "away_offering_draw": false,
        "winner": 1,
        "conclusion_type": 1,
        "opened_at": 1_600_000_000,
        "started_at": 1_600_000_100,
        "ended_at": null
    })
}

pub fn game_json(id: i64) -> Value {
    game_with_players(id, user_json(1, "artemis"), user_json(2, "apollo"), Value::Null)
}

pub fn game(id: i64) -> Arc<Game> {
    Arc::new(Game::from_wire(&game_json(id)).expect("fixture game decodes"))
}

fn piece(piece_type: i64, side: i64) -> Value {
    json!([piece_type, side])
}

/// The standard starting position, rank 1 first
pub fn starting_board() -> Value {
    let back_rank = |side| {
        Value::Array(
            [3, 5, 4, 2, 1, 4, 5, 3]
                .iter()
                .map(|t| piece(*t, side))
                .collect(),
        )
    };
    let pawns = |side| Value::Array((0..8).map(|_| piece(6, side)).collect());
    let empty = || Value::Array(vec![Value::Null; 8]);
    json!([
        back_rank(1),
        pawns(1),
        empty(),
        empty(),
        empty(),
        empty(),
        pawns(2),
        back_rank(2)
    ])
}

pub fn game_state_json(turn_number: u32) -> Value {
    json!({
        "board": starting_board(),
        "host_time": 600,
        "away_time": 595.5,
        "last_turn": 1_600_000_200,
        "current_turn": if turn_number % 2 == 0 { 1 } else { 2 },
        "turn_number": turn_number
    })
}

pub fn move_json(start: (u8, u8), end: (u8, u8)) -> Value {
    json!({
        "start_rank": start.0,
        "start_file": start.1,
        "end_rank": end.0,
        "end_file": end.1,
        "promotion": null
    })
}

pub fn allowed_moves_json() -> Value {
    json!({
        "moves": [move_json((6, 4), (4, 4)), move_json((7, 6), (5, 5))],
        "draw_claim": null
    })
}

pub fn move_update_json() -> Value {
    json!({
        "move": move_json((1, 4), (3, 4)),
        "game_state": game_state_json(1),
        "allowed_moves": allowed_moves_json()
    })
}

pub fn game_end_json(reason: i64) -> Value {
    json!({
        "game_state": game_state_json(2),
        "reason": reason
    })
}
