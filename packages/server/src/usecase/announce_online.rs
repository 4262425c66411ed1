//! UseCase: presence announcement.
//!
//! A validated `online` frame binds a connection to a user identity:
//! the connection is installed in the registry (evicting any previous
//! session for the same identity) and every other live connection is
//! told the user came online.

use std::sync::Arc;

use crate::domain::{ConnectionId, PresenceRegistry, PusherChannel, UserId};

/// Presence announcement usecase.
pub struct AnnounceOnlineUseCase {
    registry: Arc<dyn PresenceRegistry>,
}

impl AnnounceOnlineUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Install the connection in the registry. Returns the id of the
    /// evicted connection if the identity already had a live session.
    pub async fn execute(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Option<ConnectionId> {
        self.registry.register(user_id, connection_id, sender).await
    }

    /// Fan the prebuilt presence frame out to every live connection
    /// except the subject's own. Returns the notified identities.
    pub async fn broadcast_presence(&self, subject: UserId, presence_json: &str) -> Vec<UserId> {
        let targets: Vec<UserId> = self
            .registry
            .online_users()
            .await
            .into_iter()
            .filter(|id| *id != subject)
            .collect();
        self.registry.fan_out(&targets, presence_json).await;
        targets
    }
}
