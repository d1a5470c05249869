//! Top-level client wiring.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::api::ApiClient;
use crate::auth::AuthGateway;
use crate::config::{ClientConfig, ConfigError};
use crate::favorites::Favorites;
use crate::gate::{AuthorizationGate, RouteTable};
use crate::navigation::Navigator;
use crate::session::Session;
use crate::storage::{KeyValueStore, TokenStore};

/// Errors raised while assembling an [`EstateClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// An environment variable held an invalid value.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be initialised.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Every component of the client, sharing one session.
///
/// Construction bootstraps the session from `store`, so the gate never
/// answers `RenderLoading` for a client built this way.
#[derive(Clone)]
pub struct EstateClient {
    config: ClientConfig,
    session: Session,
    auth: AuthGateway,
    api: ApiClient,
    gate: AuthorizationGate,
    favorites: Favorites,
}

impl EstateClient {
    /// Assemble a client over `store`, redirecting through `navigator`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub async fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        Self::with_routes(config, store, navigator, RouteTable::standard()).await
    }

    /// Like [`EstateClient::new`], with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for invalid environment variables.
    pub async fn from_env(
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?, store, navigator).await
    }

    /// Assemble a client guarding a custom route table.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub async fn with_routes(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        routes: RouteTable,
    ) -> Result<Self, ClientError> {
        let http = config.http_client()?;
        let tokens = TokenStore::new(Arc::clone(&store));
        let session = Session::bootstrap(&tokens).await;

        let auth = AuthGateway::new(http, config.clone(), session.clone(), tokens);
        let api = ApiClient::new(auth.clone(), Arc::clone(&navigator));
        let gate = AuthorizationGate::new(routes, session.clone(), navigator);
        let favorites = Favorites::new(store);

        info!(api_base_url = %config.api_base_url, "Client ready");
        Ok(Self {
            config,
            session,
            auth,
            api,
            gate,
            favorites,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Login, registration and logout.
    #[must_use]
    pub const fn auth(&self) -> &AuthGateway {
        &self.auth
    }

    /// Protected backend calls.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Route guard.
    #[must_use]
    pub const fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    #[must_use]
    pub const fn favorites(&self) -> &Favorites {
        &self.favorites
    }
}

impl std::fmt::Debug for EstateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstateClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gate::GateDecision;
    use crate::navigation::MemoryNavigator;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_new_bootstraps_from_store() {
        let store = Arc::new(MemoryStore::with_entries([
            ("access", "a1"),
            ("refresh", "r1"),
            ("role", "admin"),
            ("username", "alice"),
        ]));
        let config = ClientConfig::new("http://127.0.0.1:9/api/").unwrap();
        let client = EstateClient::new(config, store, Arc::new(MemoryNavigator::default()))
            .await
            .unwrap();

        let snapshot = client.session().snapshot().await;
        assert!(snapshot.bootstrapped);
        assert!(snapshot.identity.unwrap().is_admin());
        assert_eq!(client.gate().evaluate("/queries").await, GateDecision::Render);
    }

    #[tokio::test]
    async fn test_logout_keeps_favourites() {
        let store = Arc::new(MemoryStore::with_entries([
            ("access", "a1"),
            ("role", "buyer"),
            ("username", "bob"),
        ]));
        let config = ClientConfig::new("http://127.0.0.1:9/api/").unwrap();
        let client = EstateClient::new(config, store.clone(), Arc::new(MemoryNavigator::default()))
            .await
            .unwrap();

        client.favorites().add(12).unwrap();
        client.auth().logout().await;

        assert!(!client.session().is_authenticated().await);
        assert_eq!(client.favorites().ids().unwrap(), ["12"]);
        assert_eq!(store.len(), 1);
    }
}
