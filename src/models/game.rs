use super::enums::{Conclusion, GameMode, Side, Winner};
use super::user::User;
use crate::messages::wire::{
    get_bool, get_duration, get_i64, get_opt_entity, get_timestamp, get_u32, get_u64, object,
    DecodeError, FromWire, ToWire,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Time allowance for a game, in whole seconds on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeControl {
    pub main_thinking_time: Duration,
    /// Delay each turn before the main clock starts to run
    pub fixed_extra_time: Duration,
    pub time_increment_per_turn: Duration,
}

impl TimeControl {
    pub fn new(main_secs: u64, fixed_extra_secs: u64, increment_secs: u64) -> Self {
        Self {
            main_thinking_time: Duration::from_secs(main_secs),
            fixed_extra_time: Duration::from_secs(fixed_extra_secs),
            time_increment_per_turn: Duration::from_secs(increment_secs),
        }
    }

    /// Compact form such as `10m+5s` or `5m/3s+2s`
    pub fn short_form(&self) -> String {
        let mut out = format_duration(self.main_thinking_time);
        if !self.fixed_extra_time.is_zero() {
            out.push('/');
            out.push_str(&format_duration(self.fixed_extra_time));
        }
        if !self.time_increment_per_turn.is_zero() {
            out.push('+');
            out.push_str(&format_duration(self.time_increment_per_turn));
        }
        out
    }
}

fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "0s".to_string();
    }
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_form())
    }
}

impl FromWire for TimeControl {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "time control")?;
        Ok(Self::new(
            get_u64(obj, "main_thinking_time")?,
            get_u64(obj, "fixed_extra_time")?,
            get_u64(obj, "time_increment_per_turn")?,
        ))
    }
}

impl ToWire for TimeControl {
    fn to_wire(&self) -> Value {
        json!({
            "main_thinking_time": self.main_thinking_time.as_secs(),
            "fixed_extra_time": self.fixed_extra_time.as_secs(),
            "time_increment_per_turn": self.time_increment_per_turn.as_secs(),
        })
    }
}

/// A game as listed by the server
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: i64,
    pub mode: GameMode,
    pub host: Option<User>,
    pub away: Option<User>,
    pub invited: Option<User>,
    pub current_turn: Side,
    pub turn_number: u32,
    pub time_control: TimeControl,
    pub host_time: Duration,
    pub away_time: Duration,
    pub host_offering_draw: bool,
    pub away_offering_draw: bool,
    pub winner: Winner,
    pub conclusion: Conclusion,
    pub opened_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Game {
    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some() || self.winner != Winner::GameNotComplete
    }

    /// Winner and conclusion, only once the game is over
    pub fn outcome(&self) -> Option<(Winner, Conclusion)> {
        self.has_ended().then_some((self.winner, self.conclusion))
    }

    pub fn player(&self, side: Side) -> Option<&User> {
        match side {
            Side::Home => self.host.as_ref(),
            Side::Away => self.away.as_ref(),
        }
    }

    /// Which side `user_id` plays, if they are a participant
    pub fn side_of(&self, user_id: i64) -> Option<Side> {
        if self.host.as_ref().is_some_and(|u| u.id == user_id) {
            Some(Side::Home)
        } else if self.away.as_ref().is_some_and(|u| u.id == user_id) {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn remaining_time(&self, side: Side) -> Duration {
        match side {
            Side::Home => self.host_time,
            Side::Away => self.away_time,
        }
    }

    pub fn is_offering_draw(&self, side: Side) -> bool {
        match side {
            Side::Home => self.host_offering_draw,
            Side::Away => self.away_offering_draw,
        }
    }
}

impl FromWire for Game {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "game")?;
        Ok(Self {
            id: get_i64(obj, "id")?,
            mode: GameMode::from_wire_int(get_i64(obj, "mode")?)?,
            host: get_opt_entity(obj, "host")?,
            away: get_opt_entity(obj, "away")?,
            invited: get_opt_entity(obj, "invited")?,
            current_turn: Side::from_wire_int(get_i64(obj, "current_turn")?)?,
            turn_number: get_u32(obj, "turn_number")?,
            time_control: TimeControl::from_wire(value)?,
            host_time: get_duration(obj, "host_time")?,
            away_time: get_duration(obj, "away_time")?,
            host_offering_draw: get_bool(obj, "host_offering_draw")?,
            away_offering_draw: get_bool(obj, "away_offering_draw")?,
            winner: Winner::from_wire_int(get_i64(obj, "winner")?)?,
            conclusion: Conclusion::from_wire_int(get_i64(obj, "conclusion_type")?)?,
            opened_at: get_timestamp(obj, "opened_at")?,
            started_at: get_timestamp(obj, "started_at")?,
            ended_at: get_timestamp(obj, "ended_at")?,
        })
    }
}
