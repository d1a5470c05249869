//! Authenticated request pipeline.
//!
//! Every backend call other than the auth endpoints goes through
//! [`ApiClient::send`], which:
//!
//! 1. attaches `Authorization: Bearer <access>` when the session has a token
//!    and the endpoint is not one of [`crate::endpoints`]' auth paths;
//! 2. on a 401 from a protected endpoint, refreshes the access token once
//!    and re-sends the request as [`Attempt::Retry`];
//! 3. when the session cannot be recovered (no refresh token, refresh
//!    refused or failed), logs out, redirects to the login view and fails
//!    with [`ApiError::SessionExpired`].
//!
//! # Refresh Coordination
//!
//! Refreshes are single-flight. The refresh gate is a mutex held for the
//! whole refresh; each request remembers the session generation it was sent
//! under. A request that acquires the gate and finds the generation moved on
//! does not refresh: someone else already did (retry with the new token) or
//! the session ended (fail as superseded). The same check, made again under
//! the session write lock, keeps a refresh that finishes after a logout from
//! writing its token.

mod error;
mod request;

pub use error::{ApiError, ExpiryReason};
pub use request::{ApiRequest, ApiResponse, Attempt};

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthGateway, RefreshRequest, RefreshResponse};
use crate::endpoints;
use crate::navigation::{Navigator, Redirect};
use crate::session::SessionState;

/// Client for protected backend endpoints.
///
/// Cloning is cheap; clones share the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    gateway: AuthGateway,
    navigator: Arc<dyn Navigator>,
    /// Held for the duration of a token refresh.
    refresh_gate: Mutex<()>,
}

/// Token and generation a request was sent under.
struct SentWith {
    bearer: Option<SecretString>,
    generation: u64,
}

impl ApiClient {
    /// Create a pipeline that recovers through `gateway` and redirects
    /// through `navigator`.
    #[must_use]
    pub fn new(gateway: AuthGateway, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                gateway,
                navigator,
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Send `request`, refreshing the access token at most once on a 401.
    ///
    /// Any status other than 401 is returned as-is. A 401 from an auth
    /// endpoint, or from the retry, is also returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired`, carrying the original 401, when a
    /// 401 could not be recovered; the user has then been logged out and
    /// redirected to the login view. Returns `ApiError::Endpoint` without
    /// sending anything if the path leaves the API root, and
    /// `ApiError::Network` if a request could not be completed.
    #[instrument(
        skip(self, request),
        fields(request_id = %Uuid::new_v4(), method = %request.method, path = %request.path)
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let config = &self.inner.gateway.config;
        let url = config.endpoint_url(&request.path)?;
        let unauthenticated = endpoints::is_unauthenticated(config.api_path(&url));
        let mut attempt = Attempt::First;

        loop {
            let sent_with = self.sent_with(unauthenticated).await;
            let response = self
                .dispatch(request, &url, sent_with.bearer.as_ref(), attempt)
                .await?;

            if response.status != StatusCode::UNAUTHORIZED || unauthenticated {
                return Ok(response);
            }

            let Some(next) = attempt.next() else {
                warn!("Request rejected again after token refresh");
                return Ok(response);
            };

            if let Err(reason) = self.recover(sent_with.generation).await {
                return Err(ApiError::SessionExpired {
                    reason,
                    response: Box::new(response),
                });
            }
            attempt = next;
        }
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(&ApiRequest::get(path)).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(&ApiRequest::delete(path)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ApiError> {
        self.send(&ApiRequest::post(path).with_body(body)).await
    }

    async fn sent_with(&self, unauthenticated: bool) -> SentWith {
        let state = self.inner.gateway.session.read().await;
        SentWith {
            bearer: if unauthenticated {
                None
            } else {
                state.access_token().cloned()
            },
            generation: state.generation,
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &Url,
        bearer: Option<&SecretString>,
        attempt: Attempt,
    ) -> Result<ApiResponse, ApiError> {
        let gateway = &self.inner.gateway;

        let mut builder = gateway.http.request(request.method.clone(), url.clone());
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        debug!(
            status = status.as_u16(),
            attempt = %attempt,
            authorized = bearer.is_some(),
            "Response received"
        );
        Ok(ApiResponse {
            status,
            body,
            attempt,
        })
    }

    /// Bring the session past `seen`, or end it.
    ///
    /// `Ok` means a newer access token is in the session and the request
    /// should be retried.
    async fn recover(&self, seen: u64) -> Result<(), ExpiryReason> {
        let _gate = self.inner.refresh_gate.lock().await;

        let refresh_token = {
            let state = self.inner.gateway.session.read().await;
            if state.generation != seen {
                debug!("Session changed while waiting to refresh");
                return after_change(&state);
            }
            state.refresh_token.clone()
        };

        let Some(refresh_token) = refresh_token else {
            warn!("Received 401 with no refresh token");
            return self.expire(seen, ExpiryReason::NoRefreshToken).await;
        };

        match self.refresh_access(&refresh_token).await {
            Ok(access) => self.install(seen, access).await,
            Err(reason) => {
                warn!(%reason, "Token refresh failed");
                self.expire(seen, reason).await
            }
        }
    }

    #[instrument(skip_all)]
    async fn refresh_access(&self, refresh_token: &SecretString) -> Result<SecretString, ExpiryReason> {
        let gateway = &self.inner.gateway;
        let url = gateway
            .config
            .endpoint_url(endpoints::TOKEN_REFRESH)
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?;

        let response = gateway
            .http
            .post(url)
            .json(&RefreshRequest {
                refresh: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExpiryReason::RefreshRejected(status.as_u16()));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ExpiryReason::RefreshUnavailable(e.to_string()))?;

        parsed
            .access
            .filter(|access| !access.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                ExpiryReason::RefreshUnavailable("refresh response carried no access token".to_string())
            })
    }

    /// Store a refreshed access token unless the session moved on meanwhile.
    async fn install(&self, seen: u64, access: SecretString) -> Result<(), ExpiryReason> {
        let gateway = &self.inner.gateway;
        let mut state = gateway.session.write().await;
        if state.generation != seen {
            info!("Session changed during refresh, discarding refreshed token");
            return after_change(&state);
        }

        if !state.replace_access(access.clone()) {
            return Err(ExpiryReason::Superseded);
        }
        if let Err(e) = gateway.tokens.save_access(&access) {
            error!(error = %e, "Failed to persist refreshed access token");
        }
        info!("Access token refreshed");
        Ok(())
    }

    /// Log out (if nobody else has) and send the user to the login view.
    async fn expire(&self, seen: u64, reason: ExpiryReason) -> Result<(), ExpiryReason> {
        if self.inner.gateway.logout_if_current(seen).await {
            let navigator = &self.inner.navigator;
            navigator.redirect(Redirect::to_login(Some(navigator.current_location())));
            return Err(reason);
        }

        let state = self.inner.gateway.session.read().await;
        after_change(&state)
    }
}

/// Outcome for a request whose session changed under it: retry if there is a
/// token to retry with, otherwise the session was ended elsewhere.
fn after_change(state: &SessionState) -> Result<(), ExpiryReason> {
    if state.access_token().is_some() {
        Ok(())
    } else {
        Err(ExpiryReason::Superseded)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("gateway", &self.inner.gateway)
            .finish_non_exhaustive()
    }
}
