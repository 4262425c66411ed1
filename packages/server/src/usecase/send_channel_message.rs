//! UseCase: channel message routing.
//!
//! A channel message is accepted only from a current, unmuted member.
//! An elapsed mute is lifted lazily on this path; because clearing it
//! suspends the handler at the store boundary, membership is checked
//! again afterwards rather than trusting the pre-await snapshot. On
//! success the message is persisted first, then echoed to every current
//! member including the sender, so optimistic UIs can reconcile via the
//! returned `localMessageId`.

use std::sync::Arc;

use thiserror::Error;

use rally_shared::time::Clock;

use crate::domain::{
    ChannelId, ChannelRepository, MessageContent, PresenceRegistry, RepositoryError,
    StoredChannelMessage, Timestamp, UserId,
};

/// Why a channel message was not accepted. Both rejection variants are
/// silent on the wire: the sender receives no error frame.
#[derive(Debug, Error)]
pub enum SendChannelMessageError {
    #[error("user {0} is not a member of the channel")]
    NotMember(UserId),

    #[error("user {0} is muted in the channel")]
    Muted(UserId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of an accepted channel message: the persisted record plus the
/// member identities the echo frame goes to.
#[derive(Debug, Clone)]
pub struct ChannelMessageReceipt {
    pub message: StoredChannelMessage,
    pub recipients: Vec<UserId>,
}

/// Channel message routing usecase.
pub struct SendChannelMessageUseCase {
    registry: Arc<dyn PresenceRegistry>,
    channels: Arc<dyn ChannelRepository>,
    clock: Arc<dyn Clock>,
}

impl SendChannelMessageUseCase {
    pub fn new(
        registry: Arc<dyn PresenceRegistry>,
        channels: Arc<dyn ChannelRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            channels,
            clock,
        }
    }

    /// Validate, persist, and compute the fan-out set for one message.
    pub async fn execute(
        &self,
        sender: UserId,
        channel_id: &ChannelId,
        content: MessageContent,
    ) -> Result<ChannelMessageReceipt, SendChannelMessageError> {
        let membership = self
            .channels
            .get_membership(sender, channel_id)
            .await?
            .ok_or(SendChannelMessageError::NotMember(sender))?;

        let now = Timestamp::new(self.clock.now_millis());
        if membership.is_muted {
            if !membership.mute_expired(now) {
                return Err(SendChannelMessageError::Muted(sender));
            }
            self.channels.clear_mute(sender, channel_id).await?;
            // The clear suspended this handler; the membership may have
            // changed underneath it. Check again before accepting.
            let refreshed = self
                .channels
                .get_membership(sender, channel_id)
                .await?
                .ok_or(SendChannelMessageError::NotMember(sender))?;
            if refreshed.is_silenced(now) {
                return Err(SendChannelMessageError::Muted(sender));
            }
        }

        let message = self
            .channels
            .store_message(sender, channel_id, content, now)
            .await?;

        // Member list is read after persistence so the echo targets the
        // channel as it is now, not as it was before the store round-trip.
        let recipients = self
            .channels
            .get_members(channel_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        Ok(ChannelMessageReceipt {
            message,
            recipients,
        })
    }

    /// Fan the prebuilt echo frame out to the receipt's recipients.
    pub async fn broadcast(&self, recipients: &[UserId], message_json: &str) {
        self.registry.fan_out(recipients, message_json).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelInfo, ChannelMembership, UserProfile};
    use crate::infrastructure::registry::WebSocketPresenceRegistry;
    use crate::infrastructure::repository::inmemory::{
        new_user_table, InMemoryChannelRepository,
    };
    use rally_shared::time::FixedClock;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn channel_id() -> ChannelId {
        ChannelId::new("general".to_string()).unwrap()
    }

    fn content(text: &str) -> MessageContent {
        MessageContent::new(text.to_string()).unwrap()
    }

    const NOW: i64 = 1_000_000;

    async fn setup(members: &[i64]) -> (SendChannelMessageUseCase, Arc<InMemoryChannelRepository>) {
        let users = new_user_table();
        {
            let mut table = users.lock().await;
            for id in members {
                table.insert(
                    user(*id),
                    UserProfile {
                        id: user(*id),
                        display_name: format!("user-{id}"),
                        avatar_url: None,
                    },
                );
            }
        }
        let channels = Arc::new(InMemoryChannelRepository::new(users));
        channels
            .create_channel(ChannelInfo {
                id: channel_id(),
                name: "General".to_string(),
            })
            .await;
        for id in members {
            channels
                .add_member(ChannelMembership {
                    user_id: user(*id),
                    channel_id: channel_id(),
                    display_name: format!("user-{id}"),
                    is_admin: false,
                    is_muted: false,
                    mute_end_time: None,
                    joined_at: Timestamp::new(*id),
                })
                .await
                .unwrap();
        }
        let registry = Arc::new(WebSocketPresenceRegistry::new());
        let usecase = SendChannelMessageUseCase::new(
            registry,
            channels.clone(),
            Arc::new(FixedClock::new(NOW)),
        );
        (usecase, channels)
    }

    #[tokio::test]
    async fn test_member_message_reaches_all_members_including_sender() {
        // given:
        let (usecase, channels) = setup(&[1, 2, 3]).await;

        // when:
        let receipt = usecase
            .execute(user(1), &channel_id(), content("hello"))
            .await
            .unwrap();

        // then: the echo targets every member, the sender too
        assert_eq!(receipt.recipients, vec![user(1), user(2), user(3)]);
        assert_eq!(receipt.message.content, "hello");
        assert_eq!(channels.message_count(&channel_id()).await, 1);
    }

    #[tokio::test]
    async fn test_non_member_message_is_dropped() {
        // given:
        let (usecase, channels) = setup(&[2, 3]).await;

        // when:
        let result = usecase.execute(user(9), &channel_id(), content("hi")).await;

        // then: no error frame, no persistence
        assert!(matches!(
            result,
            Err(SendChannelMessageError::NotMember(u)) if u == user(9)
        ));
        assert_eq!(channels.message_count(&channel_id()).await, 0);
    }

    #[tokio::test]
    async fn test_active_mute_drops_the_message() {
        // given: the sender's mute runs until after "now"
        let (usecase, channels) = setup(&[1, 2]).await;
        channels
            .set_mute(user(1), &channel_id(), Timestamp::new(NOW + 60_000))
            .await
            .unwrap();

        // when:
        let result = usecase.execute(user(1), &channel_id(), content("hi")).await;

        // then:
        assert!(matches!(
            result,
            Err(SendChannelMessageError::Muted(u)) if u == user(1)
        ));
        assert_eq!(channels.message_count(&channel_id()).await, 0);
    }

    #[tokio::test]
    async fn test_elapsed_mute_is_lifted_and_message_accepted() {
        // given: the sender's mute ended before "now"
        let (usecase, channels) = setup(&[1, 2]).await;
        channels
            .set_mute(user(1), &channel_id(), Timestamp::new(NOW - 60_000))
            .await
            .unwrap();

        // when:
        let receipt = usecase
            .execute(user(1), &channel_id(), content("back"))
            .await
            .unwrap();

        // then: the mute was cleared first, then the message went through
        assert_eq!(receipt.message.content, "back");
        let membership = channels
            .get_membership(user(1), &channel_id())
            .await
            .unwrap()
            .unwrap();
        assert!(!membership.is_muted);
        assert!(membership.mute_end_time.is_none());
        assert_eq!(channels.message_count(&channel_id()).await, 1);
    }
}
