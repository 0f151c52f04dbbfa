use super::game::Game;
use crate::messages::wire::{
    get_bool, get_i64, get_opt_entity, get_required_timestamp, get_str, object, DecodeError,
    FromWire,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub sent_at: DateTime<Utc>,
    pub type_code: String,
    pub game: Option<Game>,
    pub message: String,
    pub read: bool,
}

impl FromWire for Notification {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "notification")?;
        Ok(Self {
            id: get_i64(obj, "id")?,
            sent_at: get_required_timestamp(obj, "sent_at")?,
            type_code: get_str(obj, "type_code")?.to_string(),
            game: get_opt_entity(obj, "game")?,
            message: get_str(obj, "message")?.to_string(),
            read: get_bool(obj, "read")?,
        })
    }
}
