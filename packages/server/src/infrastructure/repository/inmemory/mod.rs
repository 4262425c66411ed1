//! In-memory repository implementations.
//!
//! These stand in for the platform's relational store: tests construct
//! them per run with isolated state, and the server binary uses them when
//! no external store is wired in. The user table is shared between the
//! directory and channel repositories, mirroring the store where channel
//! messages join against the user table.

mod channel;
mod directory;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{UserId, UserProfile};

/// Shared user table, keyed by user id.
pub type UserTable = Arc<Mutex<HashMap<UserId, UserProfile>>>;

/// Create an empty shared user table.
pub fn new_user_table() -> UserTable {
    Arc::new(Mutex::new(HashMap::new()))
}

pub use channel::InMemoryChannelRepository;
pub use directory::InMemoryDirectoryRepository;
