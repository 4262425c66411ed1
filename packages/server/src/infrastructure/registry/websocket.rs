//! WebSocket-backed implementation of the presence registry.
//!
//! ## Responsibilities
//!
//! - Own the map of user identity to live connection (`UnboundedSender`)
//! - Enforce the at-most-one-connection-per-user invariant on register
//! - Guard unregister against stale close events via the connection id
//! - Provide the directed-send and fan-out primitives used by the router
//!   and the moderation layer
//!
//! ## Design note
//!
//! Socket creation happens in the UI layer (`ui/handler/websocket.rs`).
//! This implementation only receives the outbound channel of an upgraded
//! socket and uses it for delivery. Every mutation runs under a single
//! lock acquisition with no await point inside, so registry state can
//! never be observed mid-transition.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, PresenceRegistry, PushError, PusherChannel, PusherMessage, UserId,
};

struct RegisteredConnection {
    connection_id: ConnectionId,
    sender: PusherChannel,
}

/// WebSocket-backed presence registry.
pub struct WebSocketPresenceRegistry {
    /// Live connections keyed by user id. At most one entry per user.
    connections: Mutex<HashMap<UserId, RegisteredConnection>>,
}

impl WebSocketPresenceRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for WebSocketPresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceRegistry for WebSocketPresenceRegistry {
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Option<ConnectionId> {
        let mut connections = self.connections.lock().await;
        let evicted = connections.insert(
            user_id,
            RegisteredConnection {
                connection_id,
                sender,
            },
        );
        match evicted {
            Some(previous) if previous.connection_id != connection_id => {
                // Duplicate session: tell the older transport to close.
                // Its close event will fail the unregister guard below.
                let _ = previous.sender.send(PusherMessage::Shutdown);
                tracing::warn!(
                    "User {} already had a live connection; evicting {}",
                    user_id,
                    previous.connection_id
                );
                Some(previous.connection_id)
            }
            _ => None,
        }
    }

    async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get(&user_id) {
            Some(current) if current.connection_id == connection_id => {
                connections.remove(&user_id);
                tracing::debug!("User {} unregistered from presence registry", user_id);
                true
            }
            Some(_) => {
                // Close event from an evicted connection; the fresher
                // session keeps its slot.
                tracing::debug!(
                    "Ignoring stale close of connection {} for user {}",
                    connection_id,
                    user_id
                );
                false
            }
            None => false,
        }
    }

    async fn push_to(&self, user_id: UserId, content: &str) -> Result<(), PushError> {
        let connections = self.connections.lock().await;
        let Some(connection) = connections.get(&user_id) else {
            return Err(PushError::NotConnected(user_id));
        };
        if connection.sender.is_closed() {
            return Err(PushError::NotConnected(user_id));
        }
        connection
            .sender
            .send(PusherMessage::Frame(content.to_string()))
            .map_err(|e| PushError::SendFailed(user_id, e.to_string()))?;
        tracing::debug!("Pushed frame to user {}", user_id);
        Ok(())
    }

    async fn fan_out(&self, targets: &[UserId], content: &str) {
        let connections = self.connections.lock().await;
        for target in targets {
            let Some(connection) = connections.get(target) else {
                tracing::debug!("User {} not connected during fan-out, skipping", target);
                continue;
            };
            // Each send is isolated; one dead connection must not stop
            // delivery to the rest.
            if let Err(e) = connection
                .sender
                .send(PusherMessage::Frame(content.to_string()))
            {
                tracing::warn!("Failed to push frame to user {}: {}", target, e);
            }
        }
    }

    async fn online_users(&self) -> Vec<UserId> {
        let connections = self.connections.lock().await;
        let mut users: Vec<UserId> = connections
            .iter()
            .filter(|(_, c)| !c.sender.is_closed())
            .map(|(user_id, _)| *user_id)
            .collect();
        users.sort();
        users
    }

    async fn is_online(&self, user_id: UserId) -> bool {
        let connections = self.connections.lock().await;
        connections
            .get(&user_id)
            .is_some_and(|c| !c.sender.is_closed())
    }
}
