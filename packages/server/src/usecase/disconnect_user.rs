//! UseCase: connection teardown.
//!
//! Removes the registry entry when a connection closes, but only if the
//! closing connection is still the one on record. A close event from a
//! session that was already evicted must not tear down its successor.

use std::sync::Arc;

use crate::domain::{ConnectionId, PresenceRegistry, UserId};

/// Connection teardown usecase.
pub struct DisconnectUserUseCase {
    registry: Arc<dyn PresenceRegistry>,
}

impl DisconnectUserUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Remove the registry entry if it still belongs to `connection_id`.
    /// Returns whether an entry was removed; the caller broadcasts the
    /// offline transition only in that case.
    pub async fn execute(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.registry.unregister(user_id, connection_id).await
    }

    /// Fan the prebuilt offline presence frame out to the remaining live
    /// connections. Returns the notified identities.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PusherMessage;
    use crate::infrastructure::registry::WebSocketPresenceRegistry;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_close_of_current_connection_unregisters() {
        // given:
        let registry = Arc::new(WebSocketPresenceRegistry::new());
        let usecase = DisconnectUserUseCase::new(registry.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        registry.register(user(1), connection_id, tx).await;

        // when:
        let removed = usecase.execute(user(1), connection_id).await;

        // then:
        assert!(removed);
        assert!(!registry.is_online(user(1)).await);
    }

    #[tokio::test]
    async fn test_stale_close_is_ignored() {
        // given: connection A was replaced by connection B
        let registry = Arc::new(WebSocketPresenceRegistry::new());
        let usecase = DisconnectUserUseCase::new(registry.clone());
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let conn_a = Uuid::new_v4();
        registry.register(user(1), conn_a, tx_a).await;
        registry.register(user(1), Uuid::new_v4(), tx_b).await;

        // when: A's close event finally lands
        let removed = usecase.execute(user(1), conn_a).await;

        // then: B's registration survives
        assert!(!removed);
        assert!(registry.is_online(user(1)).await);
    }

    #[tokio::test]
    async fn test_offline_broadcast_reaches_remaining_users() {
        // given: users 1 and 2 online, user 3 just disconnected
        let registry = Arc::new(WebSocketPresenceRegistry::new());
        let usecase = DisconnectUserUseCase::new(registry.clone());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(user(1), Uuid::new_v4(), tx1).await;
        registry.register(user(2), Uuid::new_v4(), tx2).await;

        // when:
        let notified = usecase
            .broadcast_presence(user(3), r#"{"type":"presence","userId":3,"status":"offline"}"#)
            .await;

        // then:
        assert_eq!(notified, vec![user(1), user(2)]);
        assert!(matches!(rx1.try_recv(), Ok(PusherMessage::Frame(_))));
        assert!(matches!(rx2.try_recv(), Ok(PusherMessage::Frame(_))));
    }
}
