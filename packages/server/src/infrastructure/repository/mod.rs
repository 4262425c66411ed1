//! Repository implementations.

pub mod inmemory;

pub use inmemory::{InMemoryChannelRepository, InMemoryDirectoryRepository, UserTable};
