use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use thiserror::Error;

const SESSION_TREE: &str = "session";
const IDENTITY_KEY: &str = "identity";

/// Errors that can occur during session persistence
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Identity is incomplete")]
    IncompleteIdentity,
}

/// The authenticated identity issued by the login service
///
/// `uid`, `address` and `token` stand or fall together: an identity missing
/// any of them is treated as absent, never partially trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identifier of the user at the ledger
    pub uid: String,

    /// The user's ledger address
    pub address: String,

    /// Bearer token for authenticated ledger calls
    pub token: String,
}

impl Identity {
    /// Checks that every field required to trust this identity is present
    pub fn is_complete(&self) -> bool {
        !self.uid.is_empty() && !self.address.is_empty() && !self.token.is_empty()
    }
}

/// Persistent storage for the local identity record
///
/// One record survives across restarts. Anything unreadable (missing,
/// corrupt or incomplete) reads back as logged out.
pub struct SessionStore {
    db: Db,

    /// Tree holding the identity record
    sessions: Tree,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}

impl SessionStore {
    /// Opens the store at the given directory
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the database directory
    ///
    /// # Returns
    ///
    /// A new SessionStore instance
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let db = sled::open(path)?;
        let sessions = db.open_tree(SESSION_TREE)?;

        Ok(Self { db, sessions })
    }

    /// Reads the persisted identity
    ///
    /// Returns `None`, meaning logged out, when no record exists or the
    /// record cannot be trusted.
    pub fn load(&self) -> Option<Identity> {
        let value = match self.sessions.get(IDENTITY_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                warn!("Failed to read persisted identity: {}", err);
                return None;
            }
        };

        let identity: Identity = match bincode::deserialize(&value) {
            Ok(identity) => identity,
            Err(err) => {
                warn!("Persisted identity is corrupt, treating as logged out: {}", err);
                return None;
            }
        };

        if !identity.is_complete() {
            warn!("Persisted identity is incomplete, treating as logged out");
            return None;
        }

        Some(identity)
    }

    /// Persists the identity record
    pub fn save(&self, identity: &Identity) -> Result<(), SessionError> {
        let value = bincode::serialize(identity)
            .map_err(|e| SessionError::SerializationError(e.to_string()))?;

        self.sessions.insert(IDENTITY_KEY, value)?;
        self.db.flush()?;

        Ok(())
    }

    /// Removes the identity record
    pub fn clear(&self) -> Result<(), SessionError> {
        self.sessions.remove(IDENTITY_KEY)?;
        self.db.flush()?;

        Ok(())
    }
}

/// An established session, the explicit object handed to every component
///
/// Created at login/signup from the external auth service's reply, read
/// back at startup, destroyed at logout. Components receive it (or its
/// fields) explicitly; there is no ambient session state to fall back on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
}

impl Session {
    /// Establishes a session from a freshly issued identity and persists it
    ///
    /// # Arguments
    ///
    /// * `store` - Where the identity record is persisted
    /// * `identity` - The identity returned by the login/signup service
    ///
    /// # Returns
    ///
    /// The established session, or an error for an incomplete identity
    pub fn establish(store: &SessionStore, identity: Identity) -> Result<Self, SessionError> {
        if !identity.is_complete() {
            return Err(SessionError::IncompleteIdentity);
        }

        store.save(&identity)?;
        Ok(Session { identity })
    }

    /// Resumes the session persisted by a previous run, if any
    pub fn resume(store: &SessionStore) -> Option<Self> {
        store.load().map(|identity| Session { identity })
    }

    /// The user identifier at the ledger
    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    /// The session's own ledger address
    pub fn address(&self) -> &str {
        &self.identity.address
    }

    /// The bearer token for authenticated calls
    pub fn token(&self) -> &str {
        &self.identity.token
    }

    /// Ends the session and removes the persisted record
    ///
    /// The caller is responsible for dropping every poller and scan session
    /// owned by views of this session; dropping them stops their work
    /// immediately.
    pub fn end(self, store: &SessionStore) -> Result<(), SessionError> {
        store.clear()
    }
}
