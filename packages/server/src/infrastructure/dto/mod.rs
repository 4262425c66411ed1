//! Data transfer objects for the relay.
//!
//! - `websocket`: wire frames exchanged over the presence socket
//! - `conversion`: domain model to frame payload conversions

pub mod conversion;
pub mod websocket;
