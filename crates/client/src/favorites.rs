//! Favourite properties, persisted locally.
//!
//! Stored as a JSON array of id strings under [`STORAGE_KEY`], next to the
//! session record but independent of it: logging out keeps favourites.

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the favourite id list.
pub const STORAGE_KEY: &str = "favorites_v1_ids";

/// The user's favourite property ids, in the order they were added.
#[derive(Clone)]
pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
}

impl Favorites {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All favourite ids.
    ///
    /// A stored value that is not a JSON array reads as empty. Numeric
    /// entries are kept as their decimal strings; other entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub fn ids(&self) -> Result<Vec<String>, StorageError> {
        let Some(raw) = self.store.get(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()),
            Ok(_) => {
                warn!("Favourites value is not a list, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "Favourites value is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Whether `id` is a favourite.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub fn contains(&self, id: impl Display) -> Result<bool, StorageError> {
        let id = id.to_string();
        Ok(self.ids()?.contains(&id))
    }

    /// Add `id`. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub fn add(&self, id: impl Display) -> Result<bool, StorageError> {
        let id = id.to_string();
        let mut ids = self.ids()?;
        if ids.contains(&id) {
            return Ok(false);
        }
        ids.push(id);
        self.save(&ids)?;
        Ok(true)
    }

    /// Remove `id`. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub fn remove(&self, id: impl Display) -> Result<bool, StorageError> {
        let id = id.to_string();
        let mut ids = self.ids()?;
        let before = ids.len();
        ids.retain(|existing| *existing != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.save(&ids)?;
        Ok(true)
    }

    /// Flip `id`. Returns whether it is a favourite afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub fn toggle(&self, id: impl Display) -> Result<bool, StorageError> {
        let id = id.to_string();
        if self.remove(&id)? {
            Ok(false)
        } else {
            self.add(&id)
        }
    }

    fn save(&self, ids: &[String]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(ids)?;
        self.store.set(STORAGE_KEY, &encoded)?;
        debug!(count = ids.len(), "Favourites saved");
        Ok(())
    }
}

impl std::fmt::Debug for Favorites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Favorites").finish_non_exhaustive()
    }
}
