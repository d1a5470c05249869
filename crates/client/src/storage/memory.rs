//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KeyValueStore, Mutation, StorageError};

/// Key-value store held in process memory.
///
/// Contents are lost when the process exits. Used by tests and by callers
/// that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // Batches are swapped in whole, so a poisoned map is never half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn apply(&self, batch: &[Mutation<'_>]) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let mut next = entries.clone();
        for mutation in batch {
            match *mutation {
                Mutation::Set { key, value } => {
                    next.insert(key.to_owned(), value.to_owned());
                }
                Mutation::Remove { key } => {
                    next.remove(key);
                }
            }
        }
        *entries = next;
        Ok(())
    }
}
