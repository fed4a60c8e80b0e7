//! Session Store
//!
//! Process-wide identity container. A session is either anonymous or holds a
//! complete [`Identity`]; there is no way to build a token without a username
//! or the reverse.
//!
//! Persistence is delegated to a [`SessionPersistence`] adapter supplied by
//! the host. The store rehydrates synchronously at construction, so any view
//! created afterwards sees the restored session.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};

/// Persistence adapter errors
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authenticated identity
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    token: String,
    username: String,
    is_superuser: bool,
}

impl Identity {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::token)
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::username)
    }

    pub fn is_superuser(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_superuser)
    }

    /// Derived: a non-empty token is present
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some_and(|t| !t.is_empty())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn to_persisted(&self) -> PersistedSession {
        match &self.identity {
            Some(id) => PersistedSession {
                token: Some(id.token.clone()),
                username: Some(id.username.clone()),
                is_superuser: id.is_superuser,
            },
            None => PersistedSession::default(),
        }
    }

    /// Accept a stored record only when it is complete
    fn from_persisted(record: PersistedSession) -> Self {
        match (record.token, record.username) {
            (Some(token), Some(username)) if !token.is_empty() => Self {
                identity: Some(Identity {
                    token,
                    username,
                    is_superuser: record.is_superuser,
                }),
            },
            (None, None) => Self::anonymous(),
            _ => {
                warn!("Discarding partial persisted session");
                Self::anonymous()
            }
        }
    }
}

/// On-disk session record
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("is_superuser", &self.is_superuser)
            .finish()
    }
}

/// Durable storage for the session, supplied by the host
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> std::result::Result<Option<PersistedSession>, SessionStoreError>;
    fn save(&self, session: &PersistedSession) -> std::result::Result<(), SessionStoreError>;
    fn clear(&self) -> std::result::Result<(), SessionStoreError>;
}

/// JSON file persistence (`~/.local/share/deployx/session.json` by default)
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> std::result::Result<Option<PersistedSession>, SessionStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save(&self, session: &PersistedSession) -> std::result::Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(session)?;

        // Bearer token: owner-only from creation, before any byte is written
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // An existing file keeps its mode on open
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(data.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> std::result::Result<(), SessionStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory persistence for tests and embedded hosts
#[derive(Default)]
pub struct MemorySessionPersistence {
    record: RwLock<Option<PersistedSession>>,
}

impl MemorySessionPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing record, as if left behind by a previous run
    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }

    pub fn stored(&self) -> Option<PersistedSession> {
        self.record.read().clone()
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn load(&self) -> std::result::Result<Option<PersistedSession>, SessionStoreError> {
        Ok(self.record.read().clone())
    }

    fn save(&self, session: &PersistedSession) -> std::result::Result<(), SessionStoreError> {
        *self.record.write() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> std::result::Result<(), SessionStoreError> {
        *self.record.write() = None;
        Ok(())
    }
}

/// Shared session container
///
/// Only [`set_auth`](Self::set_auth) and [`logout`](Self::logout) mutate it.
pub struct SessionStore {
    current: RwLock<Session>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Create a store, restoring whatever the adapter holds
    pub fn rehydrate(persistence: Arc<dyn SessionPersistence>) -> Arc<Self> {
        let session = match persistence.load() {
            Ok(Some(record)) => Session::from_persisted(record),
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!("Failed to load persisted session: {}", e);
                Session::anonymous()
            }
        };

        if let Some(username) = session.username() {
            debug!(username, "Session rehydrated");
        }

        Arc::new(Self {
            current: RwLock::new(session),
            persistence,
        })
    }

    /// Anonymous store backed by memory only
    pub fn in_memory() -> Arc<Self> {
        Self::rehydrate(Arc::new(MemorySessionPersistence::new()))
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> Session {
        self.current.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.read().token().map(str::to_string)
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().username().map(str::to_string)
    }

    pub fn is_superuser(&self) -> bool {
        self.current.read().is_superuser()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_authenticated()
    }

    /// Establish the session; all three fields are replaced together
    pub fn set_auth(&self, token: &str, username: &str, is_superuser: bool) -> Result<()> {
        if token.is_empty() {
            return Err(ConsoleError::validation("token", "Session token must not be empty"));
        }

        let session = Session {
            identity: Some(Identity {
                token: token.to_string(),
                username: username.to_string(),
                is_superuser,
            }),
        };

        let record = session.to_persisted();
        *self.current.write() = session;

        if let Err(e) = self.persistence.save(&record) {
            warn!("Failed to persist session: {}", e);
        }

        info!(username, is_superuser, "Session established");
        Ok(())
    }

    /// Clear the session and purge persisted storage
    pub fn logout(&self) {
        let previous = std::mem::take(&mut *self.current.write());

        if let Err(e) = self.persistence.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }

        if let Some(username) = previous.username() {
            info!(username, "Session cleared");
        }
    }
}
