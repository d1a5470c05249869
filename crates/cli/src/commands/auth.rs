//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! # Log in as a buyer (password from ESTATE_PASSWORD or --password)
//! estate login bob --password hunter2
//!
//! # Log in through the admin endpoint
//! estate login alice --role admin
//!
//! # Create an account, then log in separately
//! estate register bob bob@example.com --password hunter2
//!
//! estate whoami
//! estate logout
//! ```

use estate_client::{Credentials, EstateClient, LoginError, RegisterError, RegistrationProfile};
use estate_core::Role;
use tracing::info;

use crate::output;

/// Log in and persist the session.
///
/// # Errors
///
/// Returns `LoginError` if the input is invalid or the login fails.
pub async fn login(
    client: &EstateClient,
    username: &str,
    password: String,
    role: Role,
) -> Result<(), LoginError> {
    let credentials = Credentials::new(username, password)?;
    let identity = client.auth().login(&credentials, role).await?;

    output::line(format_args!(
        "Logged in as {} ({})",
        identity.username, identity.role
    ));
    Ok(())
}

/// Register a new account.
///
/// Backend validation messages are printed one per field before the error
/// is returned.
///
/// # Errors
///
/// Returns `RegisterError` if the input is invalid or the backend refuses it.
pub async fn register(
    client: &EstateClient,
    username: &str,
    email: &str,
    password: String,
) -> Result<(), RegisterError> {
    let profile = RegistrationProfile::new(username, email, password)?;

    match client.auth().register(&profile).await {
        Ok(()) => {
            output::line(format_args!(
                "Registered {username}. Log in with `estate login {username}`."
            ));
            Ok(())
        }
        Err(RegisterError::Rejected {
            status,
            fields,
            message,
        }) => {
            for (field, messages) in fields.iter() {
                for message in messages {
                    output::line(format_args!("  {field}: {message}"));
                }
            }
            Err(RegisterError::Rejected {
                status,
                fields,
                message,
            })
        }
        Err(e) => Err(e),
    }
}

/// End the session.
pub async fn logout(client: &EstateClient) {
    client.auth().logout().await;
    output::line(format_args!("Logged out"));
}

/// Show who is logged in.
pub async fn whoami(client: &EstateClient) {
    let snapshot = client.session().snapshot().await;
    match snapshot.identity {
        Some(identity) => {
            let refresh = if snapshot.has_refresh_token {
                "refresh token stored"
            } else {
                "no refresh token"
            };
            output::line(format_args!(
                "{} ({}), {refresh}",
                identity.username, identity.role
            ));
        }
        None => output::line(format_args!("Not logged in")),
    }
    info!(generation = snapshot.generation, "Session inspected");
}
