//! Backend auth endpoint paths, relative to the API root.
//!
//! These are the only endpoints the request pipeline treats as
//! unauthenticated: it never attaches a bearer token to them and never
//! answers their 401s with a token refresh.

use estate_core::Role;

/// Login for buyers and owners.
pub const LOGIN: &str = "accounts/login/";
/// Login for administrators.
pub const ADMIN_LOGIN: &str = "accounts/admin-login/";
/// Account registration.
pub const REGISTER: &str = "accounts/register/";
/// Exchange a refresh token for a new access token.
pub const TOKEN_REFRESH: &str = "accounts/token/refresh/";

const UNAUTHENTICATED: [&str; 4] = [LOGIN, ADMIN_LOGIN, REGISTER, TOKEN_REFRESH];

/// Login endpoint for the role the user is signing in as.
#[must_use]
pub const fn login_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_LOGIN,
        Role::Buyer | Role::Owner => LOGIN,
    }
}

/// Whether `path` addresses one of the auth endpoints.
///
/// Comparison ignores a leading slash, a query string and a missing
/// trailing slash, and is otherwise exact.
#[must_use]
pub fn is_unauthenticated(path: &str) -> bool {
    let path = normalize(path);
    UNAUTHENTICATED
        .iter()
        .any(|endpoint| endpoint.trim_end_matches('/') == path)
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_start_matches('/').trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_for_role() {
        assert_eq!(login_for(Role::Admin), ADMIN_LOGIN);
        assert_eq!(login_for(Role::Buyer), LOGIN);
        assert_eq!(login_for(Role::Owner), LOGIN);
    }

    #[test]
    fn test_auth_endpoints_are_unauthenticated() {
        assert!(is_unauthenticated("accounts/login/"));
        assert!(is_unauthenticated("/accounts/admin-login"));
        assert!(is_unauthenticated("accounts/register/?next=/"));
        assert!(is_unauthenticated("/accounts/token/refresh/"));
    }

    #[test]
    fn test_protected_endpoints_are_authenticated() {
        assert!(!is_unauthenticated("properties/"));
        assert!(!is_unauthenticated("accounts/users/"));
        // Only exact paths count, not substrings.
        assert!(!is_unauthenticated("properties/login-tips/"));
        assert!(!is_unauthenticated("accounts/token/"));
    }
}
