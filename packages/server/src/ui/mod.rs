//! UI layer: axum router, WebSocket handler, and server lifecycle.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::{build_router, Server};
pub use state::AppState;
