//! Pipeline errors.

use thiserror::Error;

use super::ApiResponse;
use crate::config::EndpointError;

/// Errors returned by [`super::ApiClient`].
///
/// Non-401 statuses are not errors; they arrive as an
/// [`super::ApiResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The session could not be recovered after a 401 and has been ended.
    /// `response` is the 401 that started the recovery.
    #[error("session expired: {reason}")]
    SessionExpired {
        reason: ExpiryReason,
        response: Box<ApiResponse>,
    },

    /// The request path does not address an endpoint under the API root.
    /// Nothing was sent.
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] EndpointError),
}

impl ApiError {
    /// Whether the user has been logged out by this request.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Why the session ended, if it did.
    #[must_use]
    pub const fn expiry_reason(&self) -> Option<&ExpiryReason> {
        match self {
            Self::SessionExpired { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// The backend's 401 for a request that ended the session.
    #[must_use]
    pub fn rejected_response(&self) -> Option<&ApiResponse> {
        match self {
            Self::SessionExpired { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }
}

/// Why a 401 could not be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpiryReason {
    /// There was no refresh token to recover with.
    #[error("no refresh token")]
    NoRefreshToken,

    /// The refresh endpoint answered with this non-success status.
    #[error("token refresh rejected (HTTP {0})")]
    RefreshRejected(u16),

    /// The refresh call failed or returned no usable token.
    #[error("token refresh failed: {0}")]
    RefreshUnavailable(String),

    /// The session was ended or replaced while this request was waiting on
    /// a refresh.
    #[error("session ended during refresh")]
    Superseded,
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::api::Attempt;

    #[test]
    fn test_expiry_display() {
        let err = ApiError::SessionExpired {
            reason: ExpiryReason::RefreshRejected(401),
            response: Box::new(ApiResponse {
                status: StatusCode::UNAUTHORIZED,
                body: br#"{"detail": "expired"}"#.to_vec(),
                attempt: Attempt::First,
            }),
        };
        assert_eq!(
            err.to_string(),
            "session expired: token refresh rejected (HTTP 401)"
        );
        assert!(err.is_session_expired());
        assert_eq!(err.expiry_reason(), Some(&ExpiryReason::RefreshRejected(401)));
        assert_eq!(
            err.rejected_response().map(|r| r.status),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            ExpiryReason::NoRefreshToken.to_string(),
            "no refresh token"
        );
    }
}
