//! Navigator for a terminal session.
//!
//! There is no browser history to rewrite, so redirects are reported to the
//! user and the new location is remembered for the rest of the command.

use std::sync::{Mutex, PoisonError};

use estate_client::{Navigator, Redirect};
use tracing::info;

use crate::output;

pub struct TerminalNavigator {
    location: Mutex<String>,
}

impl TerminalNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
        }
    }
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn redirect(&self, redirect: Redirect) {
        info!(%redirect, "Redirecting");
        output::line(format_args!("-> {redirect}"));
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = redirect.path().to_string();
    }
}
