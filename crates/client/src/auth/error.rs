//! Auth gateway errors.

use estate_core::{EmailError, UsernameError};
use thiserror::Error;

use super::models::FieldErrors;
use crate::config::EndpointError;
use crate::storage::StorageError;

/// Input rejected before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("password cannot be empty")]
    EmptyPassword,
}

/// Why a login did not produce a session.
///
/// Session and persisted record are untouched whenever this is returned.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The credentials failed local validation; nothing was sent.
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    /// The backend answered with a non-success status.
    #[error("login rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A success status whose body lacked a usable token or role.
    #[error("malformed login response: {0}")]
    MalformedResponse(String),

    /// The request could not be completed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The session could not be persisted.
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),

    /// The configured API root cannot address the endpoint.
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] EndpointError),
}

impl LoginError {
    /// Whether the backend refused the credentials, as opposed to the
    /// attempt failing for another reason.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Why a registration did not succeed.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The profile failed local validation; nothing was sent.
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    /// The backend refused the profile. `fields` holds per-field messages
    /// such as a taken username; `message` any general one.
    #[error("registration rejected (HTTP {status}): {}", describe_rejection(.fields, .message.as_deref()))]
    Rejected {
        status: u16,
        fields: FieldErrors,
        message: Option<String>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured API root cannot address the endpoint.
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] EndpointError),
}

impl RegisterError {
    /// Backend messages for one form field, empty unless this is a rejection
    /// that named it.
    #[must_use]
    pub fn field(&self, name: &str) -> &[String] {
        match self {
            Self::Rejected { fields, .. } => fields.get(name),
            _ => &[],
        }
    }
}

fn describe_rejection(fields: &FieldErrors, message: Option<&str>) -> String {
    match (fields.is_empty(), message) {
        (false, _) => fields.to_string(),
        (true, Some(message)) => message.to_owned(),
        (true, None) => "registration failed".to_owned(),
    }
}
