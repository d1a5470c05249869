//! The routing boundary.
//!
//! The client never renders views; it only tells the host application where
//! to go. A [`Navigator`] reports the current location and performs
//! redirects. Terminal front ends, test doubles and embedding UIs each
//! provide their own.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Login view for buyers and owners.
pub const LOGIN_VIEW: &str = "/login";
/// Login view for administrators.
pub const ADMIN_LOGIN_VIEW: &str = "/admin-login";
/// Shown to a logged-in user whose role may not open the requested view.
pub const UNAUTHORIZED_VIEW: &str = "/unauthorized";

/// A navigation the client asks the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Send the user to a login view.
    Login {
        /// Login view to open (`/login` or `/admin-login`).
        path: &'static str,
        /// Location to return to after a successful login.
        return_to: Option<String>,
    },
    /// Send the user to the unauthorized view.
    Unauthorized,
}

impl Redirect {
    /// Redirect to the regular login view, remembering `return_to`.
    #[must_use]
    pub fn to_login(return_to: Option<String>) -> Self {
        Self::Login {
            path: LOGIN_VIEW,
            return_to,
        }
    }

    /// Path of the view this redirect opens.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Login { path, .. } => path,
            Self::Unauthorized => UNAUTHORIZED_VIEW,
        }
    }

    /// Location to come back to after login, if one was remembered.
    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        match self {
            Self::Login { return_to, .. } => return_to.as_deref(),
            Self::Unauthorized => None,
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.return_to() {
            Some(from) => write!(f, "{} (from {from})", self.path()),
            None => f.write_str(self.path()),
        }
    }
}

/// Host routing used by the client for redirects.
pub trait Navigator: Send + Sync {
    /// The location the user is currently on, including any query string.
    fn current_location(&self) -> String;

    /// Replace the current location with the redirect target.
    fn redirect(&self, redirect: Redirect);
}

/// Navigator that only records what it was asked to do.
///
/// Used by tests and by hosts that poll for pending redirects.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    location: String,
    history: Vec<Redirect>,
}

impl MemoryNavigator {
    /// Start at `location`.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavState {
                location: location.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Move to `location` without a redirect, as a user click would.
    pub fn visit(&self, location: impl Into<String>) {
        self.lock().location = location.into();
    }

    /// Every redirect performed so far, oldest first.
    #[must_use]
    pub fn redirects(&self) -> Vec<Redirect> {
        self.lock().history.clone()
    }

    /// The most recent redirect.
    #[must_use]
    pub fn last_redirect(&self) -> Option<Redirect> {
        self.lock().history.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> String {
        self.lock().location.clone()
    }

    fn redirect(&self, redirect: Redirect) {
        let mut state = self.lock();
        redirect.path().clone_into(&mut state.location);
        state.history.push(redirect);
    }
}
