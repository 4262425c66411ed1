//! Reconnection-aware client session for the Rally presence relay.
//!
//! Wraps one WebSocket connection per browser-tab-equivalent, owning
//! automatic reconnect with capped exponential backoff, a pending-frame
//! queue drained on reconnection, a periodic heartbeat, and a typed
//! event surface consumed by UI components.

pub mod backoff;
pub mod error;
pub mod formatter;
pub mod invitations;
pub mod queue;
pub mod session;
pub mod ui;

pub use backoff::ReconnectPolicy;
pub use error::SessionError;
pub use invitations::InvitationTracker;
pub use session::{RelaySession, SessionConfig, SessionEvent};
