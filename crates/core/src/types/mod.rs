//! Core types for Estate Locator.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod identity;
pub mod role;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::Identity;
pub use role::{Role, RoleError};
pub use username::{Username, UsernameError};
