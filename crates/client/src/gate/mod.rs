//! Role-based gating of application routes.
//!
//! [`check`] is the whole decision: a pure function of a session snapshot
//! and a route's [`Access`]. [`AuthorizationGate`] looks the route up in a
//! [`RouteTable`], takes a fresh snapshot on every call and, when asked to
//! navigate, performs the resulting redirect. Nothing is cached between
//! navigations.

mod routes;

pub use routes::{Access, RouteAccess, RouteTable};

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::navigation::{Navigator, Redirect};
use crate::session::{Session, SessionSnapshot};

/// Outcome of evaluating a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Show the requested view.
    Render,
    /// The session is still loading; show a placeholder and decide later.
    RenderLoading,
    /// Nobody is logged in.
    RedirectToLogin {
        /// Login view to open.
        login_path: &'static str,
        /// The location originally requested.
        return_to: String,
    },
    /// Logged in, but the role may not open this view.
    RedirectToUnauthorized,
    /// No route matches the location.
    NotFound,
}

impl GateDecision {
    /// The redirect this decision calls for, if any.
    #[must_use]
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            Self::RedirectToLogin {
                login_path,
                return_to,
            } => Some(Redirect::Login {
                path: *login_path,
                return_to: Some(return_to.clone()),
            }),
            Self::RedirectToUnauthorized => Some(Redirect::Unauthorized),
            Self::Render | Self::RenderLoading | Self::NotFound => None,
        }
    }
}

/// Decide whether `snapshot` may open a route with `access` at `location`.
///
/// Public routes always render. For protected routes: not bootstrapped
/// yields `RenderLoading`, no identity yields `RedirectToLogin`, a role
/// outside a non-empty required set yields `RedirectToUnauthorized`, and
/// anything else renders.
#[must_use]
pub fn check(snapshot: &SessionSnapshot, access: &Access, location: &str) -> GateDecision {
    let Access::Roles(required) = access else {
        return GateDecision::Render;
    };

    if !snapshot.bootstrapped {
        return GateDecision::RenderLoading;
    }

    let Some(identity) = &snapshot.identity else {
        return GateDecision::RedirectToLogin {
            login_path: access.login_view(),
            return_to: location.to_string(),
        };
    };

    if !required.is_empty() && !required.contains(&identity.role) {
        return GateDecision::RedirectToUnauthorized;
    }

    GateDecision::Render
}

/// Route guard bound to one session.
#[derive(Clone)]
pub struct AuthorizationGate {
    routes: Arc<RouteTable>,
    session: Session,
    navigator: Arc<dyn Navigator>,
}

impl AuthorizationGate {
    /// Guard `routes` using `session`, redirecting through `navigator`.
    #[must_use]
    pub fn new(routes: RouteTable, session: Session, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            routes: Arc::new(routes),
            session,
            navigator,
        }
    }

    /// Decide on a navigation to `location` without acting on it.
    pub async fn evaluate(&self, location: &str) -> GateDecision {
        let Some(route) = self.routes.resolve(location) else {
            return GateDecision::NotFound;
        };
        let snapshot = self.session.snapshot().await;
        check(&snapshot, &route.access, location)
    }

    /// Decide on a navigation to `location` and perform any redirect.
    #[instrument(skip(self))]
    pub async fn navigate(&self, location: &str) -> GateDecision {
        let decision = self.evaluate(location).await;
        debug!(?decision, "Navigation evaluated");
        if let Some(redirect) = decision.redirect() {
            self.navigator.redirect(redirect);
        }
        decision
    }

    /// The table this gate consults.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::navigation::{ADMIN_LOGIN_VIEW, LOGIN_VIEW, MemoryNavigator};
    use estate_core::{Identity, Role, Username};
    use secrecy::SecretString;

    fn snapshot(role: Option<Role>) -> SessionSnapshot {
        SessionSnapshot {
            identity: role.map(|role| Identity::new(Username::parse("bob").unwrap(), role)),
            bootstrapped: true,
            has_refresh_token: false,
            generation: 1,
        }
    }

    /// Every subset of the three roles.
    fn role_sets() -> Vec<Vec<Role>> {
        (0u8..8)
            .map(|mask| {
                Role::ALL
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| mask & (1 << i) != 0)
                    .map(|(_, role)| *role)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_role_gating_for_every_role_and_required_set() {
        for required in role_sets() {
            let access = Access::Roles(required.clone());
            for role in Role::ALL {
                let decision = check(&snapshot(Some(role)), &access, "/x");
                let allowed = required.is_empty() || required.contains(&role);
                let expected = if allowed {
                    GateDecision::Render
                } else {
                    GateDecision::RedirectToUnauthorized
                };
                assert_eq!(decision, expected, "role {role} against {required:?}");
            }

            assert!(matches!(
                check(&snapshot(None), &access, "/x"),
                GateDecision::RedirectToLogin { .. }
            ));
        }
    }

    #[test]
    fn test_not_bootstrapped_defers() {
        let loading = SessionSnapshot::default();
        assert_eq!(
            check(&loading, &Access::roles([Role::Buyer]), "/properties"),
            GateDecision::RenderLoading
        );
        assert_eq!(
            check(&loading, &Access::Public, "/"),
            GateDecision::Render
        );
    }

    #[test]
    fn test_login_redirect_preserves_location() {
        let decision = check(
            &snapshot(None),
            &Access::roles([Role::Admin]),
            "/queries?page=2",
        );
        assert_eq!(
            decision,
            GateDecision::RedirectToLogin {
                login_path: ADMIN_LOGIN_VIEW,
                return_to: "/queries?page=2".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_gate_redirects_through_navigator() {
        let session = Session::new();
        let navigator = Arc::new(MemoryNavigator::new("/"));
        let gate = AuthorizationGate::new(RouteTable::standard(), session.clone(), navigator.clone());

        assert_eq!(gate.navigate("/favourites").await, GateDecision::RenderLoading);
        assert!(navigator.redirects().is_empty());

        session.write().await.bootstrapped = true;
        gate.navigate("/properties/3").await;
        assert_eq!(
            navigator.last_redirect(),
            Some(Redirect::Login {
                path: LOGIN_VIEW,
                return_to: Some("/properties/3".to_string()),
            })
        );

        session.write().await.establish(
            Identity::new(Username::parse("olivia").unwrap(), Role::Owner),
            SecretString::from("a1"),
            None,
        );
        assert_eq!(
            gate.navigate("/favorites").await,
            GateDecision::RedirectToUnauthorized
        );
        assert_eq!(gate.navigate("/dashboard").await, GateDecision::Render);
        assert_eq!(gate.navigate("/missing").await, GateDecision::NotFound);
        assert_eq!(navigator.redirects().len(), 2);
    }
}
