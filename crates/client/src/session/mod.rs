//! In-memory session state.
//!
//! One [`Session`] exists per running application. Every component that
//! needs it receives a clone of the handle; clones share state.
//!
//! # Invariants
//!
//! - An identity is present exactly when an access token is present. Both
//!   live in one `Option<Authenticated>` so they cannot drift apart.
//! - `generation` increases on every write (login, refresh, logout). The
//!   request pipeline uses it to notice that the session changed while a
//!   request or refresh was in flight.
//! - Only the auth gateway and the pipeline's refresh path write; both do so
//!   while holding the write lock across the matching storage write, so a
//!   reader never sees memory and storage disagree mid-update.

mod bootstrap;

use std::sync::Arc;

use estate_core::Identity;
use secrecy::SecretString;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to the session.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

/// Identity together with the bearer token that proves it.
#[derive(Clone)]
pub(crate) struct Authenticated {
    pub(crate) identity: Identity,
    pub(crate) access_token: SecretString,
}

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) authenticated: Option<Authenticated>,
    pub(crate) refresh_token: Option<SecretString>,
    pub(crate) bootstrapped: bool,
    pub(crate) generation: u64,
}

impl SessionState {
    pub(crate) fn establish(
        &mut self,
        identity: Identity,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) {
        self.authenticated = Some(Authenticated {
            identity,
            access_token,
        });
        self.refresh_token = refresh_token;
        self.generation += 1;
    }

    /// Replace the access token, keeping identity and refresh token.
    ///
    /// Returns `false` (and changes nothing) when there is no identity to
    /// attach the token to.
    pub(crate) fn replace_access(&mut self, access_token: SecretString) -> bool {
        let Some(authenticated) = self.authenticated.as_mut() else {
            return false;
        };
        authenticated.access_token = access_token;
        self.generation += 1;
        true
    }

    /// Drop identity and tokens. `bootstrapped` is left as it is.
    pub(crate) fn clear(&mut self) {
        self.authenticated = None;
        self.refresh_token = None;
        self.generation += 1;
    }

    pub(crate) fn access_token(&self) -> Option<&SecretString> {
        self.authenticated.as_ref().map(|a| &a.access_token)
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            identity: self.authenticated.as_ref().map(|a| a.identity.clone()),
            bootstrapped: self.bootstrapped,
            has_refresh_token: self.refresh_token.is_some(),
            generation: self.generation,
        }
    }
}

/// Point-in-time, token-free view of the session.
///
/// This is what the authorization gate evaluates; it can be cloned and
/// compared freely without exposing credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Logged-in identity, if any.
    pub identity: Option<Identity>,
    /// Whether the initial load from storage has completed.
    pub bootstrapped: bool,
    /// Whether a 401 can be recovered by refreshing.
    pub has_refresh_token: bool,
    /// Write counter at the time of the snapshot.
    pub generation: u64,
}

impl SessionSnapshot {
    /// Whether an identity is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Session {
    /// A session that has not been bootstrapped yet.
    ///
    /// The authorization gate answers `RenderLoading` for every protected
    /// route until [`Session::restore`] runs. Use [`Session::bootstrap`] to
    /// construct and restore in one step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, without tokens.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().await.snapshot()
    }

    /// The logged-in identity, if any.
    pub async fn identity(&self) -> Option<Identity> {
        self.inner
            .read()
            .await
            .authenticated
            .as_ref()
            .map(|a| a.identity.clone())
    }

    /// Whether someone is logged in.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.authenticated.is_some()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use estate_core::{Role, Username};
    use secrecy::ExposeSecret;

    fn bob() -> Identity {
        Identity::new(Username::parse("bob").unwrap(), Role::Buyer)
    }

    #[tokio::test]
    async fn test_new_session_is_anonymous_and_not_bootstrapped() {
        let snapshot = Session::new().snapshot().await;
        assert!(!snapshot.bootstrapped);
        assert!(!snapshot.is_authenticated());
        assert!(!snapshot.has_refresh_token);
    }

    #[tokio::test]
    async fn test_establish_and_clear_move_together() {
        let session = Session::new();
        {
            let mut state = session.write().await;
            state.establish(bob(), SecretString::from("a1"), Some(SecretString::from("r1")));
        }
        assert_eq!(session.identity().await, Some(bob()));
        assert!(session.snapshot().await.has_refresh_token);

        session.write().await.clear();
        let state = session.read().await;
        assert!(state.authenticated.is_none());
        assert!(state.access_token().is_none());
        assert!(state.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_replace_access_requires_identity() {
        let session = Session::new();
        let mut state = session.write().await;
        assert!(!state.replace_access(SecretString::from("a2")));
        assert_eq!(state.generation, 0);

        state.establish(bob(), SecretString::from("a1"), None);
        assert!(state.replace_access(SecretString::from("a2")));
        assert_eq!(state.access_token().unwrap().expose_secret(), "a2");
        assert_eq!(state.generation, 2);
    }

    #[tokio::test]
    async fn test_every_write_bumps_generation() {
        let session = Session::new();
        let before = session.snapshot().await.generation;
        session
            .write()
            .await
            .establish(bob(), SecretString::from("a1"), None);
        session.write().await.clear();
        assert_eq!(session.snapshot().await.generation, before + 2);
    }
}
