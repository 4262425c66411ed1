//! Shared utilities for the Rally presence relay.
//!
//! Provides the clock abstraction and logging setup used by both the
//! server and the client crates.

pub mod logger;
pub mod time;
