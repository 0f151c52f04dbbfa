use crate::messages::wire::{
    get_i64, get_opt_bool, get_opt_string, get_required_timestamp, get_str, object, DecodeError,
    FromWire,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A player account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub elo: i64,
    pub created_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
    /// Only sent when the viewer is this user
    pub private: Option<PrivateDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateDetails {
    pub email: String,
    pub email_verified: bool,
}

impl FromWire for User {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, "user")?;
        let private = match get_opt_string(obj, "email")? {
            Some(email) => Some(PrivateDetails {
                email,
                email_verified: get_opt_bool(obj, "email_verified")?.unwrap_or(false),
            }),
            None => None,
        };
        Ok(Self {
            id: get_i64(obj, "id")?,
            username: get_str(obj, "username")?.to_string(),
            elo: get_i64(obj, "elo")?,
            created_at: get_required_timestamp(obj, "created_at")?,
            avatar_url: get_opt_string(obj, "avatar_url")?,
            private,
        })
    }
}
