//! Authenticated identity.

use serde::{Deserialize, Serialize};

use super::role::Role;
use super::username::Username;

/// Who is logged in.
///
/// Minimal data the client keeps about the current user: enough to greet
/// them and to decide which views they may open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account username.
    pub username: Username,
    /// Account role.
    pub role: Role,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub const fn new(username: Username, role: Role) -> Self {
        Self { username, role }
    }

    /// Whether this identity holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
