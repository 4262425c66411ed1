//! Presence and real-time messaging relay for Rally, an online Pong
//! platform.
//!
//! Maintains the registry of connected users and routes real-time
//! events (direct chat, game invitations, channel group chat, moderation
//! notifications) between them over persistent WebSocket connections.
//! CRUD, authentication and rendering live elsewhere in the platform;
//! the relay reaches the relational store only through the repository
//! traits in [`domain`].

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
