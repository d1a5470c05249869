//! Restoring the session from storage at startup.

use tracing::{info, warn};

use super::Session;
use crate::storage::TokenStore;

impl Session {
    /// Construct a session already restored from `tokens`.
    pub async fn bootstrap(tokens: &TokenStore) -> Self {
        let session = Self::new();
        session.restore(tokens).await;
        session
    }

    /// Load the persisted record into memory and mark the session
    /// bootstrapped.
    ///
    /// Identity is restored only when the record holds an access token, a
    /// known role and a username. The refresh token is restored whenever an
    /// identity is. Storage errors are logged and treated as an empty record;
    /// startup never fails. Calling this again after it has completed is a
    /// no-op.
    pub async fn restore(&self, tokens: &TokenStore) {
        let mut state = self.write().await;
        if state.bootstrapped {
            return;
        }

        let record = tokens.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read persisted session, starting anonymous");
            Default::default()
        });

        if let Some((identity, access)) = record.identity() {
            info!(username = %identity.username, role = %identity.role, "Session restored");
            state.establish(identity, access, record.refresh);
        } else if !record.is_empty() {
            warn!(record = ?record, "Ignoring incomplete persisted session");
        }

        state.bootstrapped = true;
    }
}
