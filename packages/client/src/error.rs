//! Error types for the client session.

use thiserror::Error;

/// Client-side session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session driver has stopped; no further frames can be handed
    /// to it.
    #[error("session is closed")]
    Closed,
}
