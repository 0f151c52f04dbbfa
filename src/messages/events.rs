use super::wire::{field, get_i64, object, DecodeError, FromWire};
use crate::chess::{AllowedMoves, Move};
use crate::models::{Conclusion, DisconnectReason, Game, GameState, Notification};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Key the client attaches to every outbound event
pub const EVENT_ID_FIELD: &str = "event_id";
/// Key the server attaches to a correlated response
pub const RESPONSE_TO_FIELD: &str = "response_to";

/// One named event on the game socket. On the wire it is the JSON text
/// `[name, payload]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub name: String,
    pub payload: Value,
}

impl EventFrame {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn to_text(&self) -> String {
        Value::Array(vec![Value::String(self.name.clone()), self.payload.clone()]).to_string()
    }

    pub fn from_text(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| DecodeError::invalid_value("frame", e.to_string()))?;
        let parts = value
            .as_array()
            .ok_or_else(|| DecodeError::invalid_type("frame", "[name, payload] array"))?;
        let name = parts
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::invalid_type("frame name", "string"))?;
        let payload = parts.get(1).cloned().unwrap_or(Value::Null);
        Ok(Self::new(name, payload))
    }

    /// The request this frame answers, if it carries a correlation id
    pub fn response_to(&self) -> Option<u64> {
        self.payload.get(RESPONSE_TO_FIELD)?.as_u64()
    }
}

/// Names of the events the server pushes to a game connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    GameDisconnect,
    GameStart,
    GameEnd,
    DrawOffer,
    Move,
    GameState,
    AllowedMoves,
    Notification,
    RequestError,
}

impl EventName {
    pub const ALL: &'static [EventName] = &[
        EventName::GameDisconnect,
        EventName::GameStart,
        EventName::GameEnd,
        EventName::DrawOffer,
        EventName::Move,
        EventName::GameState,
        EventName::AllowedMoves,
        EventName::Notification,
        EventName::RequestError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            EventName::GameDisconnect => "game_disconnect",
            EventName::GameStart => "game_start",
            EventName::GameEnd => "game_end",
            EventName::DrawOffer => "draw_offer",
            EventName::Move => "move",
            EventName::GameState => "game_state",
            EventName::AllowedMoves => "allowed_moves",
            EventName::Notification => "notification",
            EventName::RequestError => "request_error",
        }
    }

    pub fn parse(name: &str) -> Option<EventName> {
        Self::ALL.iter().copied().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pushed event, already decoded into domain values
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    GameDisconnect(DisconnectReason),
    GameStart,
    GameEnd(GameEnd),
    DrawOffer,
    Move(MoveUpdate),
    GameState(GameState),
    AllowedMoves(AllowedMoves),
    Notification(Notification),
}

impl PushEvent {
    pub fn name(&self) -> EventName {
        match self {
            PushEvent::GameDisconnect(_) => EventName::GameDisconnect,
            PushEvent::GameStart => EventName::GameStart,
            PushEvent::GameEnd(_) => EventName::GameEnd,
            PushEvent::DrawOffer => EventName::DrawOffer,
            PushEvent::Move(_) => EventName::Move,
            PushEvent::GameState(_) => EventName::GameState,
            PushEvent::AllowedMoves(_) => EventName::AllowedMoves,
            PushEvent::Notification(_) => EventName::Notification,
        }
    }

    /// Decode the payload of a pushed event. `request_error` is not a push
    /// event and yields `None`, as does any name this client does not know.
    pub fn decode(
        name: EventName,
        payload: &Value,
        game: &Arc<Game>,
    ) -> Option<Result<PushEvent, DecodeError>> {
        let event = match name {
            EventName::GameDisconnect => decode_disconnect(payload).map(PushEvent::GameDisconnect),
            EventName::GameStart => Ok(PushEvent::GameStart),
            EventName::GameEnd => GameEnd::decode(payload, game).map(PushEvent::GameEnd),
            EventName::DrawOffer => Ok(PushEvent::DrawOffer),
            EventName::Move => MoveUpdate::decode(payload, game).map(PushEvent::Move),
            EventName::GameState => GameState::from_wire(payload, Arc::clone(game))
                .map(PushEvent::GameState),
            EventName::AllowedMoves => AllowedMoves::from_wire(payload).map(PushEvent::AllowedMoves),
            EventName::Notification => {
                Notification::from_wire(payload).map(PushEvent::Notification)
            }
            EventName::RequestError => return None,
        };
        Some(event)
    }
}

fn decode_disconnect(payload: &Value) -> Result<DisconnectReason, DecodeError> {
    let obj = object(payload, "game_disconnect")?;
    DisconnectReason::from_wire_int(get_i64(obj, "reason")?)
}

/// Payload of `game_end`
#[derive(Debug, Clone, PartialEq)]
pub struct GameEnd {
    pub state: GameState,
    pub conclusion: Conclusion,
}

impl GameEnd {
    pub fn decode(payload: &Value, game: &Arc<Game>) -> Result<Self, DecodeError> {
        let obj = object(payload, "game_end")?;
        Ok(Self {
            state: GameState::from_wire(field(obj, "game_state")?, Arc::clone(game))?,
            conclusion: Conclusion::from_wire_int(get_i64(obj, "reason")?)?,
        })
    }
}

/// Payload of `move`: the move played, the resulting state, and the
/// opponent's options
#[derive(Debug, Clone, PartialEq)]
pub struct MoveUpdate {
    pub mv: Move,
    pub state: GameState,
    pub allowed_moves: AllowedMoves,
}

impl MoveUpdate {
    pub fn decode(payload: &Value, game: &Arc<Game>) -> Result<Self, DecodeError> {
        let obj = object(payload, "move")?;
        Ok(Self {
            mv: Move::from_wire(field(obj, "move")?)?,
            state: GameState::from_wire(field(obj, "game_state")?, Arc::clone(game))?,
            allowed_moves: AllowedMoves::from_wire(field(obj, "allowed_moves")?)?,
        })
    }
}

/// Payload object for an outbound event
pub fn payload(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
