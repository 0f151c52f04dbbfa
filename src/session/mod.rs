//! The authenticated identity shared by the REST client and game connections.
//!
//! A [`Session`] is an explicit context value: clone it into whatever needs
//! it. All clones share one cached identity, which only [`Session::store`]
//! and [`Session::clear`] change.

pub mod identity;

pub use identity::SessionIdentity;

use crate::storage::{CredentialStore, StorageError};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

const SESSION_ID_KEY: &str = "session_id";
const SESSION_TOKEN_KEY: &str = "session_token";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    cached: Arc<RwLock<Option<SessionIdentity>>>,
}

impl Session {
    /// A session backed by `store`; nothing is read until first use
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Like [`Session::new`], but fails unless valid credentials are persisted
    pub fn load(store: Arc<dyn CredentialStore>) -> Result<Self, SessionError> {
        let session = Self::new(store);
        session.current_identity()?;
        Ok(session)
    }

    /// The current identity, read from the store on first use
    pub fn current_identity(&self) -> Result<SessionIdentity, SessionError> {
        if let Ok(cached) = self.cached.read() {
            if let Some(identity) = cached.as_ref() {
                return Ok(identity.clone());
            }
        }

        let mut cached = self
            .cached
            .write()
            .map_err(|_| SessionError::NotAuthenticated)?;
        // Another clone may have filled the cache while we waited
        if let Some(identity) = cached.as_ref() {
            return Ok(identity.clone());
        }

        let identity = self.read_persisted().ok_or(SessionError::NotAuthenticated)?;
        debug!("Loaded session {} from credential store", identity.session_id());
        *cached = Some(identity.clone());
        Ok(identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_identity().is_ok()
    }

    /// Persist a new identity and make it current
    pub fn store(&self, session_id: i64, token: Vec<u8>) -> Result<SessionIdentity, SessionError> {
        let identity = SessionIdentity::new(session_id, token);
        let mut cached = self
            .cached
            .write()
            .map_err(|_| SessionError::NotAuthenticated)?;
        *cached = None;
        let previous_id = self.store.get(SESSION_ID_KEY);
        self.store
            .set(SESSION_ID_KEY, &identity.session_id().to_string())?;
        if let Err(e) = self.store.set(SESSION_TOKEN_KEY, &identity.token_base64()) {
            self.restore_id(previous_id.as_deref());
            return Err(e.into());
        }
        *cached = Some(identity.clone());
        info!("Stored session {}", session_id);
        Ok(identity)
    }

    /// Forget the identity, both cached and persisted (logout, account deletion)
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut cached = self
            .cached
            .write()
            .map_err(|_| SessionError::NotAuthenticated)?;
        *cached = None;
        self.store.remove(SESSION_ID_KEY)?;
        self.store.remove(SESSION_TOKEN_KEY)?;
        info!("Cleared session");
        Ok(())
    }

    /// Put back the id that paired with the persisted token. If that fails
    /// too, drop the id so no mixed identity can be read back.
    fn restore_id(&self, previous: Option<&str>) {
        let restored = match previous {
            Some(id) => self.store.set(SESSION_ID_KEY, id),
            None => self.store.remove(SESSION_ID_KEY),
        };
        if let Err(e) = restored {
            warn!("Could not restore previous session id: {}", e);
            if let Err(e) = self.store.remove(SESSION_ID_KEY) {
                warn!("Credential store may hold a mismatched session: {}", e);
            }
        }
    }

    fn read_persisted(&self) -> Option<SessionIdentity> {
        let id = self.store.get(SESSION_ID_KEY)?;
        let token = self.store.get(SESSION_TOKEN_KEY)?;
        SessionIdentity::from_persisted(&id, &token)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cached.read().ok().and_then(|c| c.as_ref().map(|i| i.session_id()));
        f.debug_struct("Session").field("cached", &cached).finish()
    }
}
