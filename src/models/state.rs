use super::enums::Side;
use super::game::Game;
use crate::chess::Board;
use crate::messages::wire::{
    field, get_duration, get_i64, get_timestamp, get_u32, object, DecodeError, FromWire,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Both clocks as of the last turn boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    pub host_time: Duration,
    pub away_time: Duration,
    pub last_turn: Option<DateTime<Utc>>,
    pub current_turn: Side,
}

impl Clocks {
    /// Time left for `side` at `now`; only the side to move is running
    pub fn remaining(&self, side: Side, now: DateTime<Utc>) -> Duration {
        let base = match side {
            Side::Home => self.host_time,
            Side::Away => self.away_time,
        };
        if side != self.current_turn {
            return base;
        }
        let Some(last_turn) = self.last_turn else {
            return base;
        };
        let elapsed = (now - last_turn).to_std().unwrap_or(Duration::ZERO);
        base.saturating_sub(elapsed)
    }
}

/// Position and clocks of a live game
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub board: Board,
    pub clocks: Clocks,
    pub turn_number: u32,
    pub game: Arc<Game>,
}

impl GameState {
    /// Decode a state belonging to `game`
    pub fn from_wire(value: &Value, game: Arc<Game>) -> Result<Self, DecodeError> {
        let obj = object(value, "game state")?;
        Ok(Self {
            board: Board::from_wire(field(obj, "board")?)?,
            clocks: Clocks {
                host_time: get_duration(obj, "host_time")?,
                away_time: get_duration(obj, "away_time")?,
                last_turn: get_timestamp(obj, "last_turn")?,
                current_turn: Side::from_wire_int(get_i64(obj, "current_turn")?)?,
            },
            turn_number: get_u32(obj, "turn_number")?,
            game,
        })
    }

    pub fn side_to_move(&self) -> Side {
        self.clocks.current_turn
    }

    /// Side to move matches turn parity, and the turn number has the same
    /// parity as the owning game's
    pub fn agrees_with_game(&self) -> bool {
        self.side_to_move() == Side::for_turn(self.turn_number)
            && self.turn_number % 2 == self.game.turn_number % 2
    }
}
