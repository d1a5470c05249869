//! Declarative route access table.

use estate_core::Role;

use crate::navigation::{ADMIN_LOGIN_VIEW, LOGIN_VIEW};

/// Who may open a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Anyone, logged in or not, bootstrapped or not.
    Public,
    /// Logged-in users whose role is listed. An empty list admits every
    /// logged-in user.
    Roles(Vec<Role>),
}

impl Access {
    /// Logged-in users with one of `roles`.
    #[must_use]
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::Roles(roles.into_iter().collect())
    }

    /// Any logged-in user.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self::Roles(Vec::new())
    }

    /// Login view anonymous visitors are sent to: the admin login for
    /// admin-only routes, the regular one otherwise.
    #[must_use]
    pub fn login_view(&self) -> &'static str {
        match self {
            Self::Roles(roles) if !roles.is_empty() && roles.iter().all(|r| *r == Role::Admin) => {
                ADMIN_LOGIN_VIEW
            }
            _ => LOGIN_VIEW,
        }
    }
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAccess {
    /// Path pattern; segments starting with `:` match any non-empty segment.
    pub pattern: &'static str,
    /// Who may open it.
    pub access: Access,
}

/// Maps application paths to access rules.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteAccess>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl RouteTable {
    /// An empty table; every path is unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The application's routes.
    #[must_use]
    pub fn standard() -> Self {
        let shoppers = || Access::roles([Role::Buyer, Role::Admin]);

        Self::new()
            .route("/", Access::Public)
            .route("/contact", Access::Public)
            .route("/register", Access::Public)
            .route("/login", Access::Public)
            .route("/admin-login", Access::Public)
            .route("/unauthorized", Access::Public)
            .route("/properties", shoppers())
            .route("/properties/:id", shoppers())
            .route("/favourites", shoppers())
            .route("/post-property", Access::roles([Role::Admin]))
            .route("/queries", Access::roles([Role::Admin]))
            .route("/dashboard", Access::roles([Role::Owner]))
            .alias("/favorites", "/favourites")
    }

    /// Add a route. Earlier routes win when patterns overlap.
    #[must_use]
    pub fn route(mut self, pattern: &'static str, access: Access) -> Self {
        self.routes.push(RouteAccess { pattern, access });
        self
    }

    /// Make `from` resolve exactly like `to`.
    #[must_use]
    pub fn alias(mut self, from: &'static str, to: &'static str) -> Self {
        self.aliases.push((from, to));
        self
    }

    /// Find the rule for `location`.
    ///
    /// Query string, fragment and trailing slash are ignored. Returns `None`
    /// for unknown paths.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Option<&RouteAccess> {
        let path = normalize(location);
        let path = self
            .aliases
            .iter()
            .find(|(from, _)| normalize(from) == path)
            .map_or(path, |(_, to)| normalize(to));

        self.routes
            .iter()
            .find(|route| matches(normalize(route.pattern), path))
    }

    /// All routes, in match order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteAccess> {
        self.routes.iter()
    }
}

/// Path without query, fragment or surrounding slashes; `/` becomes empty.
fn normalize(location: &str) -> &str {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_matches('/')
}

fn matches(pattern: &str, path: &str) -> bool {
    let mut pattern = pattern.split('/');
    let mut path = path.split('/');
    loop {
        match (pattern.next(), path.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual))
                if expected == actual || (expected.starts_with(':') && !actual.is_empty()) => {}
            _ => return false,
        }
    }
}
