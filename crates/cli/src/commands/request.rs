//! Raw API requests through the authenticated pipeline.
//!
//! # Usage
//!
//! ```bash
//! estate request GET properties/
//! estate request POST properties/ --data '{"title": "Sea view flat"}'
//! estate request DELETE properties/12/
//! ```
//!
//! The bearer token is attached automatically; an expired access token is
//! refreshed once and the request re-sent.

use estate_client::{ApiError, ApiRequest, EstateClient};
use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::output;

/// Errors that can occur while issuing a request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The backend answered, but not with success.
    #[error("Request failed with HTTP {0}")]
    Status(StatusCode),
}

/// Send one request and print the response.
///
/// # Errors
///
/// Returns `RequestError` for invalid input, a failed or expired session,
/// or a non-success response.
pub async fn send(
    client: &EstateClient,
    method: &str,
    path: &str,
    data: Option<&str>,
) -> Result<(), RequestError> {
    let request = build(method, path, data)?;
    let response = client.api().send(&request).await?;

    output::line(format_args!(
        "HTTP {} (attempt {})",
        response.status, response.attempt
    ));
    let body = response.json::<serde_json::Value>().map_or_else(
        |_| response.text(),
        |value| serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
    );
    if !body.is_empty() {
        output::line(format_args!("{body}"));
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(RequestError::Status(response.status))
    }
}

fn build(method: &str, path: &str, data: Option<&str>) -> Result<ApiRequest, RequestError> {
    let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestError::InvalidMethod(method.to_string()))?;

    let request = ApiRequest::new(method, path);
    Ok(match data {
        Some(raw) => request.with_body(serde_json::from_str(raw)?),
        None => request,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_normalises_method_and_parses_body() {
        let request = build("post", "properties/", Some(r#"{"title": "Flat"}"#)).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["title"], "Flat");
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(matches!(
            build("GE T", "properties/", None),
            Err(RequestError::InvalidMethod(_))
        ));
        assert!(matches!(
            build("POST", "properties/", Some("{oops")),
            Err(RequestError::InvalidBody(_))
        ));
    }
}
