//! Presence registry trait: the single source of truth for who is online
//! and the send primitives the router and moderation layer use.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::PushError;
use super::value_object::UserId;

/// Identity of one transport connection, used to guard teardown against
/// stale close events after a duplicate-session eviction.
pub type ConnectionId = Uuid;

/// Message pushed into a connection's outbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PusherMessage {
    /// A serialized frame to write to the transport.
    Frame(String),
    /// Instruct the socket task to close the transport. Sent to a
    /// connection that lost its registry slot to a newer session.
    Shutdown,
}

/// Outbound channel of one live connection.
pub type PusherChannel = mpsc::UnboundedSender<PusherMessage>;

/// Live-connection registry keyed by user identity.
///
/// Invariant: at most one registered connection per user at any instant.
/// All mutations happen under a single lock acquisition with no await
/// points in between, so the invariant cannot be violated by interleaved
/// handlers.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Install `sender` as the live connection for `user_id`. Any previous
    /// connection for the same identity is told to shut down first.
    /// Returns the id of the evicted connection, if there was one.
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Option<ConnectionId>;

    /// Remove the entry for `user_id`, but only if it still belongs to
    /// `connection_id`. Returns whether an entry was removed. A close
    /// event from an evicted connection therefore cannot tear down the
    /// session that replaced it.
    async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool;

    /// Directed send of one frame to `user_id`'s live connection.
    /// `PushError::NotConnected` is a normal outcome, not a fault.
    async fn push_to(&self, user_id: UserId, content: &str) -> Result<(), PushError>;

    /// Best-effort directed send repeated over `targets`. A failure for
    /// one recipient never aborts delivery to the rest.
    async fn fan_out(&self, targets: &[UserId], content: &str);

    /// Identities that currently hold a writable connection.
    async fn online_users(&self) -> Vec<UserId>;

    /// Whether `user_id` currently holds a writable connection.
    async fn is_online(&self, user_id: UserId) -> bool;
}
