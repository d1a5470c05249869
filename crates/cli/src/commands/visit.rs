//! Route access checks.
//!
//! # Usage
//!
//! ```bash
//! estate visit /properties/12
//! estate visit /queries
//! ```

use estate_client::{EstateClient, GateDecision};

use crate::output;

/// Evaluate a navigation to `path` and report the outcome.
pub async fn visit(client: &EstateClient, path: &str) {
    match client.gate().navigate(path).await {
        GateDecision::Render => output::line(format_args!("Render {path}")),
        GateDecision::RenderLoading => output::line(format_args!("Loading {path}")),
        GateDecision::NotFound => output::line(format_args!("Not found: {path}")),
        // The navigator has already reported the redirect.
        GateDecision::RedirectToLogin { .. } | GateDecision::RedirectToUnauthorized => {}
    }
}
