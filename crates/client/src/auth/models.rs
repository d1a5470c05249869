//! Auth inputs and backend wire shapes.

use std::collections::BTreeMap;
use std::fmt;

use estate_core::{Email, Username};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::InputError;

/// Username and password for a login attempt.
#[derive(Clone)]
pub struct Credentials {
    /// Account username.
    pub username: Username,
    /// Account password.
    pub password: SecretString,
}

impl Credentials {
    /// Validate raw input.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the username is empty or too long, or the
    /// password is empty.
    pub fn new(username: &str, password: impl Into<String>) -> Result<Self, InputError> {
        let username = Username::parse(username)?;
        let password = non_empty_password(password.into())?;
        Ok(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Details for a new buyer account.
#[derive(Clone)]
pub struct RegistrationProfile {
    /// Requested username.
    pub username: Username,
    /// Contact email.
    pub email: Email,
    /// Initial password.
    pub password: SecretString,
}

impl RegistrationProfile {
    /// Validate raw input.
    ///
    /// # Errors
    ///
    /// Returns `InputError` naming the first invalid field.
    pub fn new(username: &str, email: &str, password: impl Into<String>) -> Result<Self, InputError> {
        Ok(Self {
            username: Username::parse(username)?,
            email: Email::parse(email)?,
            password: non_empty_password(password.into())?,
        })
    }
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn non_empty_password(password: String) -> Result<SecretString, InputError> {
    if password.is_empty() {
        return Err(InputError::EmptyPassword);
    }
    Ok(SecretString::from(password))
}

/// Per-field validation messages returned by the backend.
///
/// Built from bodies shaped like `{"username": ["already taken"]}`. A field
/// whose value is a single string is kept as a one-message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Extract field errors from a JSON error body.
    ///
    /// Top-level keys other than `detail`, `message` and `error` are treated
    /// as field names.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return Self::default();
        };

        let fields = object
            .iter()
            .filter(|(key, _)| !GENERAL_MESSAGE_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| {
                let messages: Vec<String> = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_owned))
                        .collect(),
                    _ => Vec::new(),
                };
                (!messages.is_empty()).then(|| (key.clone(), messages))
            })
            .collect();
        Self(fields)
    }

    /// Messages for `field`, empty if it has none.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// First message for `field`.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    /// Whether no field carried a message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All fields and their messages, ordered by field name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

const GENERAL_MESSAGE_KEYS: [&str; 3] = ["detail", "message", "error"];

/// Human-readable message from an error body, if it carries one.
///
/// Looks at `detail`, `message` and `error` in that order, then at the first
/// entry of `non_field_errors`.
pub(crate) fn general_message(body: &Value) -> Option<String> {
    GENERAL_MESSAGE_KEYS
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .or_else(|| {
            body.get("non_field_errors")
                .and_then(|v| v.get(0))
                .and_then(Value::as_str)
        })
        .map(str::to_owned)
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub(crate) access: Option<String>,
    #[serde(default)]
    pub(crate) refresh: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub(crate) refresh: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub(crate) access: Option<String>,
}
