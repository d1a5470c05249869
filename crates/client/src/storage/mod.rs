//! Persisted key-value storage.
//!
//! The client keeps its durable state (session tokens, favourites) in a flat
//! string-to-string store. Every write is a batch of [`Mutation`]s that a
//! backend must apply atomically: a reader sees either none or all of a
//! batch.
//!
//! - [`MemoryStore`] - In-process map, for tests and embedding
//! - [`FileStore`] - A JSON file replaced atomically on every write
//! - [`TokenStore`] - The session record on top of either

mod file;
mod memory;
mod tokens;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use tokens::{PersistedSession, TokenStore, keys};

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or replacing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entries could not be encoded for the backing file.
    #[error("failed to encode storage entries: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single change within an atomic write batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    /// Insert or overwrite `key`.
    Set {
        /// Key to write.
        key: &'a str,
        /// New value.
        value: &'a str,
    },
    /// Delete `key`; deleting an absent key is not an error.
    Remove {
        /// Key to delete.
        key: &'a str,
    },
}

/// Durable string key-value storage.
///
/// Implementations must be safe to share between tasks and must apply each
/// batch passed to [`KeyValueStore::apply`] atomically with respect to
/// concurrent [`KeyValueStore::get`] calls.
pub trait KeyValueStore: Send + Sync {
    /// Read one key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply a batch of mutations atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch could not be applied; in that case
    /// none of it is visible.
    fn apply(&self, batch: &[Mutation<'_>]) -> Result<(), StorageError>;

    /// Write a single key.
    ///
    /// # Errors
    ///
    /// See [`KeyValueStore::apply`].
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.apply(&[Mutation::Set { key, value }])
    }
}
