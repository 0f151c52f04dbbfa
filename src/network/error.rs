use crate::messages::{ApiError, DecodeError};
use crate::session::SessionError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the REST client, game connections and paginators
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Connection to the game server was lost")]
    ConnectionLost,

    #[error("Server error {}: {}", .0.code, .0.message)]
    Application(ApiError),

    #[error("Malformed server data: {0}")]
    Decode(#[from] DecodeError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Request encryption failed: {0}")]
    Encryption(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// The server error, if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Application(e) => Some(e),
            _ => None,
        }
    }

    pub fn in_domain(&self, domain: u32) -> bool {
        self.api_error().is_some_and(|e| e.in_domain(domain))
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::Application(err)
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotAuthenticated => ClientError::NotAuthenticated,
            SessionError::Storage(e) => ClientError::Storage(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
