use super::wire::{get_str, get_u32, object, DecodeError, FromWire};
use serde_json::Value;
use std::fmt;

const ENVELOPE: &str = "error envelope";

/// Structured error reported by the server: `{error: <code>, message: <text>}`
///
/// Codes are hierarchical. A code belongs to every domain whose decimal digits
/// prefix its own, so 2134 is in 21, 213 and 2134 but not in 22.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: u32,
    pub message: String,
}

impl ApiError {
    /// Reserved code the listing endpoints use to say there are no more pages
    pub const NO_MORE_PAGES: u32 = 4101;

    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Check whether this error falls under `domain`
    pub fn in_domain(&self, domain: u32) -> bool {
        if domain == 0 {
            return false;
        }
        self.code.to_string().starts_with(&domain.to_string())
    }

    /// The first `depth` digits of the code, e.g. depth 2 of 2134 is 21
    pub fn domain(&self, depth: usize) -> Option<u32> {
        let digits = self.code.to_string();
        if depth == 0 || depth > digits.len() {
            return None;
        }
        digits[..depth].parse().ok()
    }

    pub fn is_pagination_exhausted(&self) -> bool {
        self.code == Self::NO_MORE_PAGES
    }

    /// Pull an error envelope out of a response body, if it is one.
    ///
    /// Any object with a non-null `error` member is an envelope; one whose
    /// code is not a valid error code decodes to an error naming the envelope.
    pub fn from_envelope(value: &Value) -> Option<Result<Self, DecodeError>> {
        let code = value.as_object()?.get("error")?;
        if code.is_null() {
            return None;
        }
        Some(Self::from_wire(value).map_err(|e| DecodeError::invalid_value(ENVELOPE, e.to_string())))
    }
}

impl FromWire for ApiError {
    fn from_wire(value: &Value) -> Result<Self, DecodeError> {
        let obj = object(value, ENVELOPE)?;
        Ok(Self {
            code: get_u32(obj, "error")?,
            message: get_str(obj, "message").unwrap_or_default().to_string(),
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
