//! Favourite property commands.
//!
//! # Usage
//!
//! ```bash
//! estate favorites list
//! estate favorites add 12
//! estate favorites toggle 12
//! ```

use estate_client::{EstateClient, StorageError};
use estate_core::PropertyId;

use crate::output;

pub fn list(client: &EstateClient) -> Result<(), StorageError> {
    let ids = client.favorites().ids()?;
    if ids.is_empty() {
        output::line(format_args!("No favourites"));
    }
    for id in ids {
        output::line(format_args!("{id}"));
    }
    Ok(())
}

pub fn add(client: &EstateClient, id: PropertyId) -> Result<(), StorageError> {
    if client.favorites().add(id)? {
        output::line(format_args!("Added {id}"));
    } else {
        output::line(format_args!("{id} is already a favourite"));
    }
    Ok(())
}

pub fn remove(client: &EstateClient, id: PropertyId) -> Result<(), StorageError> {
    if client.favorites().remove(id)? {
        output::line(format_args!("Removed {id}"));
    } else {
        output::line(format_args!("{id} was not a favourite"));
    }
    Ok(())
}

pub fn toggle(client: &EstateClient, id: PropertyId) -> Result<(), StorageError> {
    let now = if client.favorites().toggle(id)? {
        "added"
    } else {
        "removed"
    };
    output::line(format_args!("{id} {now}"));
    Ok(())
}
