//! Estate Locator CLI - drive the client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (buyer by default; --role admin uses the admin login endpoint)
//! estate login bob --password hunter2
//!
//! # Call a protected endpoint; tokens are attached and refreshed for you
//! estate request GET properties/
//!
//! # Check whether the current session may open a route
//! estate visit /post-property
//!
//! # Manage favourites and end the session
//! estate favorites toggle 12
//! estate logout
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami` - Account and session
//! - `request` - Authenticated API request
//! - `visit` - Route gate check
//! - `favorites` - Local favourite list
//!
//! The session is kept in `ESTATE_SESSION_FILE` between runs.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod commands;
mod config;
mod navigator;
mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::CliConfig;
use estate_client::{ClientConfig, EstateClient, FileStore};
use estate_core::{PropertyId, Role};
use navigator::TerminalNavigator;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "estate")]
#[command(author, version, about = "Estate Locator client")]
struct Cli {
    /// Backend API root (overrides `ESTATE_API_BASE_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Application location the command runs from, remembered if the
    /// session expires and a login redirect happens
    #[arg(long, global = true, default_value = "/")]
    from: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account username
        username: String,

        /// Account password
        #[arg(short, long, env = "ESTATE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role to log in as (`buyer`, `owner`, `admin`)
        #[arg(short, long, default_value = "buyer")]
        role: Role,
    },
    /// Create a buyer account
    Register {
        /// Requested username
        username: String,

        /// Contact email
        email: String,

        /// Initial password
        #[arg(short, long, env = "ESTATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Send an authenticated API request
    Request {
        /// HTTP method
        method: String,

        /// Endpoint path relative to the API root
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Check access to an application route
    Visit {
        /// Route path, e.g. `/properties/12`
        path: String,
    },
    /// Manage favourite properties
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favourite property ids
    List,
    /// Add a property
    Add { id: PropertyId },
    /// Remove a property
    Remove { id: PropertyId },
    /// Add the property if absent, remove it otherwise
    Toggle { id: PropertyId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CliConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "estate_client=info,estate_cli=info".into());

    let json_layer = log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = CliConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(config.as_ref().is_ok_and(|c| c.log_json));

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut client_config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        client_config.api_base_url = ClientConfig::new(url)?.api_base_url;
    }

    let store = Arc::new(FileStore::new(&config.session_file));
    let navigator = Arc::new(TerminalNavigator::new(cli.from));
    let client = EstateClient::new(client_config, store, navigator).await?;

    match cli.command {
        Commands::Login {
            username,
            password,
            role,
        } => commands::auth::login(&client, &username, password, role).await?,
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&client, &username, &email, password).await?,
        Commands::Logout => commands::auth::logout(&client).await,
        Commands::Whoami => commands::auth::whoami(&client).await,
        Commands::Request { method, path, data } => {
            commands::request::send(&client, &method, &path, data.as_deref()).await?;
        }
        Commands::Visit { path } => commands::visit::visit(&client, &path).await,
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&client)?,
            FavoritesAction::Add { id } => commands::favorites::add(&client, id)?,
            FavoritesAction::Remove { id } => commands::favorites::remove(&client, id)?,
            FavoritesAction::Toggle { id } => commands::favorites::toggle(&client, id)?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_login_with_role() {
        let cli = Cli::try_parse_from(["estate", "login", "alice", "-p", "pw", "--role", "admin"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Login { role: Role::Admin, .. }
        ));
    }

    #[test]
    fn test_parses_favourite_id() {
        let cli = Cli::try_parse_from(["estate", "favorites", "toggle", "12"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Favorites {
                action: FavoritesAction::Toggle { id }
            } if id == PropertyId::new(12)
        ));
        assert!(Cli::try_parse_from(["estate", "favorites", "add", "twelve"]).is_err());
    }
}
