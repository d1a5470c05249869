//! Estate Locator client library.
//!
//! Owns everything between the user and the backend's auth surface:
//! persisted tokens, the in-memory session, login/registration/logout,
//! the authenticated request pipeline with transparent token refresh, and
//! role-based gating of application routes.
//!
//! # Architecture
//!
//! - [`storage`] - Key-value backends and the [`TokenStore`] over them
//! - [`session`] - The shared [`Session`] and its bootstrap from storage
//! - [`auth`] - [`AuthGateway`]: login, registration, logout
//! - [`api`] - [`ApiClient`]: bearer injection and refresh-and-retry on 401
//! - [`gate`] - [`AuthorizationGate`] and the declarative route table
//! - [`favorites`] - Persisted favourite property IDs
//! - [`navigation`] - The routing boundary used for redirects
//!
//! [`EstateClient`] wires all of them together around one session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod endpoints;
pub mod favorites;
pub mod gate;
pub mod navigation;
pub mod session;
pub mod storage;

mod client;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, Attempt, ExpiryReason};
pub use auth::{
    AuthGateway, Credentials, FieldErrors, InputError, LoginError, RegisterError,
    RegistrationProfile,
};
pub use client::{ClientError, EstateClient};
pub use config::{ClientConfig, ConfigError, EndpointError};
pub use favorites::Favorites;
pub use gate::{Access, AuthorizationGate, GateDecision, RouteAccess, RouteTable};
pub use navigation::{MemoryNavigator, Navigator, Redirect};
pub use session::{Session, SessionSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PersistedSession, StorageError, TokenStore};
