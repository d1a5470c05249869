//! Persisted session record.

use std::sync::Arc;

use estate_core::{Identity, Role, Username};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::{KeyValueStore, Mutation, StorageError};

/// Storage keys for the persisted session record.
pub mod keys {
    /// Bearer access token.
    pub const ACCESS: &str = "access";
    /// Refresh token.
    pub const REFRESH: &str = "refresh";
    /// Lowercase role name.
    pub const ROLE: &str = "role";
    /// Username of the logged-in account.
    pub const USERNAME: &str = "username";

    /// Every key owned by the session record.
    pub const ALL: [&str; 4] = [ACCESS, REFRESH, ROLE, USERNAME];
}

/// The session as it survives process restarts.
///
/// Every field is optional on read: a store written by another client
/// version, or edited by hand, may hold any subset of them.
#[derive(Clone, Default)]
pub struct PersistedSession {
    /// Access token.
    pub access: Option<SecretString>,
    /// Refresh token.
    pub refresh: Option<SecretString>,
    /// Role name as stored.
    pub role: Option<String>,
    /// Username as stored.
    pub username: Option<String>,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |token: &Option<SecretString>| token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("PersistedSession")
            .field("access", &redact(&self.access))
            .field("refresh", &redact(&self.refresh))
            .field("role", &self.role)
            .field("username", &self.username)
            .finish()
    }
}

impl PersistedSession {
    /// Record for a freshly logged-in identity.
    #[must_use]
    pub fn for_login(identity: &Identity, access: SecretString, refresh: Option<SecretString>) -> Self {
        Self {
            access: Some(access),
            refresh,
            role: Some(identity.role.as_str().to_owned()),
            username: Some(identity.username.as_str().to_owned()),
        }
    }

    /// The identity and access token this record restores, if it is complete.
    ///
    /// Requires `access`, `role` and `username` to be present and valid; a
    /// record missing any of them restores nothing.
    #[must_use]
    pub fn identity(&self) -> Option<(Identity, SecretString)> {
        let access = self.access.clone()?;
        let role: Role = self.role.as_deref()?.parse().ok()?;
        let username = Username::parse(self.username.as_deref()?).ok()?;
        Some((Identity::new(username, role), access))
    }

    /// Whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none() && self.role.is_none() && self.username.is_none()
    }
}

/// Reads and writes the [`PersistedSession`] record.
///
/// Cloning is cheap; clones share the underlying store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Wrap a key-value backend.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist all four fields in one atomic batch.
    ///
    /// Fields that are `None` are removed in the same batch, so no stale
    /// value from a previous session survives.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch could not be written; the previous
    /// record is then left intact.
    pub fn save(&self, record: &PersistedSession) -> Result<(), StorageError> {
        let fields = [
            (keys::ACCESS, record.access.as_ref().map(|t| t.expose_secret())),
            (keys::REFRESH, record.refresh.as_ref().map(|t| t.expose_secret())),
            (keys::ROLE, record.role.as_deref()),
            (keys::USERNAME, record.username.as_deref()),
        ];
        let batch: Vec<Mutation<'_>> = fields
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Mutation::Set { key, value },
                None => Mutation::Remove { key },
            })
            .collect();

        self.store.apply(&batch)?;
        debug!(record = ?record, "Session record saved");
        Ok(())
    }

    /// Overwrite only the access token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write failed.
    pub fn save_access(&self, access: &SecretString) -> Result<(), StorageError> {
        self.store.set(keys::ACCESS, access.expose_secret())
    }

    /// Read the record, resolving every missing field to `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn load(&self) -> Result<PersistedSession, StorageError> {
        let read = |key: &str| self.store.get(key);
        Ok(PersistedSession {
            access: read(keys::ACCESS)?.map(SecretString::from),
            refresh: read(keys::REFRESH)?.map(SecretString::from),
            role: read(keys::ROLE)?,
            username: read(keys::USERNAME)?,
        })
    }

    /// Remove all four fields. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejected the write.
    pub fn clear(&self) -> Result<(), StorageError> {
        let batch = keys::ALL.map(|key| Mutation::Remove { key });
        self.store.apply(&batch)
    }
}
