use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use std::fmt;

/// The authenticated identity for one login: a session id plus its secret token
#[derive(Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    session_id: i64,
    token: Vec<u8>,
}

impl SessionIdentity {
    pub fn new(session_id: i64, token: Vec<u8>) -> Self {
        Self { session_id, token }
    }

    /// Rebuild from persisted text values; `None` if either is malformed
    pub fn from_persisted(session_id: &str, token: &str) -> Option<Self> {
        let session_id = session_id.trim().parse().ok()?;
        let token = general_purpose::STANDARD.decode(token.trim()).ok()?;
        if token.is_empty() {
            return None;
        }
        Some(Self { session_id, token })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub fn token_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.token)
    }

    /// Value for the socket handshake `Authorization` header
    pub fn authorization(&self) -> String {
        format!("SessionKey {}|{}", self.session_id, self.token_base64())
    }

    /// Fields appended to authenticated REST calls
    pub fn auth_fields(&self) -> [(&'static str, Value); 2] {
        [
            ("session_id", Value::from(self.session_id)),
            ("session_token", Value::from(self.token_base64())),
        ]
    }
}

// Keep the token out of logs
impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("session_id", &self.session_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
