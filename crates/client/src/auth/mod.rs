//! Login, registration and logout against the backend.
//!
//! [`AuthGateway`] is the only component that establishes or tears down a
//! session. Every write to the persisted record and the in-memory session
//! happens under the session write lock, record first, so a failed storage
//! write leaves both untouched.

mod error;
mod models;

pub use error::{InputError, LoginError, RegisterError};
pub use models::{Credentials, FieldErrors, RegistrationProfile};

pub(crate) use models::{RefreshRequest, RefreshResponse, general_message};

use estate_core::{Identity, Role};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::ClientConfig;
use crate::endpoints;
use crate::session::{Session, SessionState};
use crate::storage::{PersistedSession, TokenStore};
use models::{LoginRequest, LoginResponse, RegisterRequest};

/// Performs the account operations that change who is logged in.
#[derive(Clone)]
pub struct AuthGateway {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
    pub(crate) session: Session,
    pub(crate) tokens: TokenStore,
}

impl AuthGateway {
    /// Create a gateway writing to `session` and `tokens`.
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        config: ClientConfig,
        session: Session,
        tokens: TokenStore,
    ) -> Self {
        Self {
            http,
            config,
            session,
            tokens,
        }
    }

    /// Log in as `role`.
    ///
    /// Administrators use the admin login endpoint, everyone else the
    /// regular one. On success the persisted record and the session are both
    /// replaced and the new identity is returned. The identity's role is the
    /// one the backend reports, or `role` if the response names none.
    ///
    /// # Errors
    ///
    /// Returns `LoginError` if the backend rejects the credentials, the
    /// response carries no access token or an unknown role, the request
    /// fails, or the record cannot be persisted. Nothing is changed in any
    /// of these cases.
    #[instrument(skip(self, credentials), fields(username = %credentials.username, role = %role))]
    pub async fn login(&self, credentials: &Credentials, role: Role) -> Result<Identity, LoginError> {
        let url = self.config.endpoint_url(endpoints::login_for(role))?;

        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                username: credentials.username.as_str(),
                password: credentials.password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(general_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            warn!(status = status.as_u16(), %message, "Login rejected");
            return Err(LoginError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| LoginError::MalformedResponse(e.to_string()))?;

        let access = non_empty(parsed.access)
            .ok_or_else(|| LoginError::MalformedResponse("missing access token".to_string()))?;
        let role = match non_empty(parsed.role) {
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| LoginError::MalformedResponse(e.to_string()))?,
            None => role,
        };

        let identity = Identity::new(credentials.username.clone(), role);
        let access = SecretString::from(access);
        let refresh = non_empty(parsed.refresh).map(SecretString::from);

        let mut state = self.session.write().await;
        self.tokens.save(&PersistedSession::for_login(
            &identity,
            access.clone(),
            refresh.clone(),
        ))?;
        state.establish(identity.clone(), access, refresh);
        drop(state);

        info!(role = %identity.role, "Login succeeded");
        Ok(identity)
    }

    /// Create a buyer account.
    ///
    /// Registration does not log the new account in; the session is never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns `RegisterError::Rejected` carrying the backend's per-field
    /// messages when the profile is refused, or `RegisterError::Network` if
    /// the request fails.
    #[instrument(skip(self, profile), fields(username = %profile.username))]
    pub async fn register(&self, profile: &RegistrationProfile) -> Result<(), RegisterError> {
        let url = self.config.endpoint_url(endpoints::REGISTER)?;

        let response = self
            .http
            .post(url)
            .json(&RegisterRequest {
                username: profile.username.as_str(),
                email: profile.email.as_str(),
                password: profile.password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Registration succeeded");
            return Ok(());
        }

        let body = response.bytes().await?;
        let parsed = serde_json::from_slice::<Value>(&body).ok();
        let fields = parsed
            .as_ref()
            .map(FieldErrors::from_body)
            .unwrap_or_default();
        let message = parsed.as_ref().and_then(general_message).or_else(|| {
            let text = String::from_utf8_lossy(&body).trim().to_string();
            (parsed.is_none() && !text.is_empty()).then_some(text)
        });

        warn!(status = status.as_u16(), fields = %fields, "Registration rejected");
        Err(RegisterError::Rejected {
            status: status.as_u16(),
            fields,
            message,
        })
    }

    /// End the session.
    ///
    /// Clears the persisted record and the in-memory session. Never fails: a
    /// storage error is logged and the in-memory session is cleared anyway.
    /// Any refresh still in flight will find the session changed and discard
    /// its result.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let mut state = self.session.write().await;
        self.end_session(&mut state);
    }

    /// Log out only if the session is still at `generation`.
    ///
    /// Returns `false` without touching anything when a login, refresh or
    /// logout has happened since.
    pub(crate) async fn logout_if_current(&self, generation: u64) -> bool {
        let mut state = self.session.write().await;
        if state.generation != generation {
            return false;
        }
        self.end_session(&mut state);
        true
    }

    fn end_session(&self, state: &mut SessionState) {
        if let Err(e) = self.tokens.clear() {
            error!(error = %e, "Failed to clear persisted session");
        }
        state.clear();
        info!("Logged out");
    }

    /// The session this gateway writes to.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("api_base_url", &self.config.api_base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
