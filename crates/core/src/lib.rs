//! Estate Locator Core - Shared types library.
//!
//! This crate provides common types used across all Estate Locator components:
//! - `client` - Session, token lifecycle, request pipeline and route gating
//! - `cli` - Command-line front end driving the client against a backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Roles, identities and validated newtypes for usernames, emails and IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
