//! Command implementations.

pub mod auth;
pub mod favorites;
pub mod request;
pub mod visit;
