use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning wire JSON into domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing field '{field}'")]
    MissingField { field: String },

    #[error("Field '{field}' has the wrong type: expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("Field '{field}' has an invalid value: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown {kind} value {value}")]
    UnknownVariant { kind: &'static str, value: i64 },
}

impl DecodeError {
    pub fn missing(field: &str) -> Self {
        DecodeError::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid_type(field: &str, expected: &'static str) -> Self {
        DecodeError::InvalidType {
            field: field.to_string(),
            expected,
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A domain value that can be decoded from its wire representation
pub trait FromWire: Sized {
    fn from_wire(value: &Value) -> Result<Self, DecodeError>;
}

/// A domain value that can be sent back to the server
pub trait ToWire {
    fn to_wire(&self) -> Value;
}

/// Decode any wire value into `T`
pub fn decode<T: FromWire>(value: &Value) -> Result<T, DecodeError> {
    T::from_wire(value)
}

/// Encode a domain value into its wire representation
pub fn encode<T: ToWire + ?Sized>(value: &T) -> Value {
    value.to_wire()
}

/// Borrow a wire value as a JSON object
pub fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    value
        .as_object()
        .ok_or_else(|| DecodeError::invalid_type(what, "object"))
}

/// Required field: absent and null are both errors
pub fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value, DecodeError> {
    match obj.get(name) {
        Some(Value::Null) | None => Err(DecodeError::missing(name)),
        Some(value) => Ok(value),
    }
}

/// Optional field: absent and null both map to `None`
pub fn opt_field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match obj.get(name) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

pub fn get_i64(obj: &Map<String, Value>, name: &str) -> Result<i64, DecodeError> {
    field(obj, name)?
        .as_i64()
        .ok_or_else(|| DecodeError::invalid_type(name, "integer"))
}

pub fn get_opt_i64(obj: &Map<String, Value>, name: &str) -> Result<Option<i64>, DecodeError> {
    opt_field(obj, name)
        .map(|v| v.as_i64().ok_or_else(|| DecodeError::invalid_type(name, "integer")))
        .transpose()
}

pub fn get_u64(obj: &Map<String, Value>, name: &str) -> Result<u64, DecodeError> {
    field(obj, name)?
        .as_u64()
        .ok_or_else(|| DecodeError::invalid_type(name, "non-negative integer"))
}

pub fn get_u32(obj: &Map<String, Value>, name: &str) -> Result<u32, DecodeError> {
    let value = get_u64(obj, name)?;
    u32::try_from(value).map_err(|_| DecodeError::invalid_value(name, "out of range"))
}

pub fn get_f64(obj: &Map<String, Value>, name: &str) -> Result<f64, DecodeError> {
    field(obj, name)?
        .as_f64()
        .ok_or_else(|| DecodeError::invalid_type(name, "number"))
}

pub fn get_bool(obj: &Map<String, Value>, name: &str) -> Result<bool, DecodeError> {
    field(obj, name)?
        .as_bool()
        .ok_or_else(|| DecodeError::invalid_type(name, "boolean"))
}

pub fn get_opt_bool(obj: &Map<String, Value>, name: &str) -> Result<Option<bool>, DecodeError> {
    opt_field(obj, name)
        .map(|v| v.as_bool().ok_or_else(|| DecodeError::invalid_type(name, "boolean")))
        .transpose()
}

pub fn get_str<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str, DecodeError> {
    field(obj, name)?
        .as_str()
        .ok_or_else(|| DecodeError::invalid_type(name, "string"))
}

pub fn get_opt_string(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, DecodeError> {
    opt_field(obj, name)
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| DecodeError::invalid_type(name, "string"))
        })
        .transpose()
}

/// Decode a nested entity stored under `name`, if present
pub fn get_opt_entity<T: FromWire>(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<Option<T>, DecodeError> {
    opt_field(obj, name).map(T::from_wire).transpose()
}

/// Seconds as a duration; negative and non-finite values are rejected
pub fn get_duration(obj: &Map<String, Value>, name: &str) -> Result<Duration, DecodeError> {
    let secs = get_f64(obj, name)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| DecodeError::invalid_value(name, format!("{} is not a valid duration", secs)))
}

/// Nullable timestamp in seconds since the Unix epoch
pub fn get_timestamp(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, DecodeError> {
    let Some(value) = opt_field(obj, name) else {
        return Ok(None);
    };
    let secs = value
        .as_f64()
        .ok_or_else(|| DecodeError::invalid_type(name, "number"))?;
    timestamp_from_secs(secs)
        .map(Some)
        .ok_or_else(|| DecodeError::invalid_value(name, format!("{} is not a valid timestamp", secs)))
}

/// Required timestamp
pub fn get_required_timestamp(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<DateTime<Utc>, DecodeError> {
    get_timestamp(obj, name)?.ok_or_else(|| DecodeError::missing(name))
}

fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
