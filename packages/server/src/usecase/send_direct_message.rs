//! UseCase: direct chat routing.
//!
//! Checks the recipient's block-list before forwarding. A blocked sender
//! learns nothing: the frame is dropped without an acknowledgement. For
//! an unblocked sender the delivery acknowledgement is pushed even when
//! the recipient is offline; missed messages are recovered from the
//! persisted store on the recipient's next fetch, not replayed here.

use std::sync::Arc;

use crate::domain::{DirectoryRepository, PresenceRegistry, PushError, RepositoryError, UserId};

/// What happened to a routed chat frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMessageOutcome {
    /// The recipient blocks the sender; nothing was sent to anyone.
    Blocked,
    /// Delivered to the recipient, acknowledgement pushed to the sender.
    Delivered,
    /// Recipient unreachable; acknowledgement still pushed to the sender.
    RecipientOffline,
}

/// Direct chat routing usecase.
pub struct SendDirectMessageUseCase {
    registry: Arc<dyn PresenceRegistry>,
    directory: Arc<dyn DirectoryRepository>,
}

impl SendDirectMessageUseCase {
    pub fn new(
        registry: Arc<dyn PresenceRegistry>,
        directory: Arc<dyn DirectoryRepository>,
    ) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Route one chat frame. `chat_json` goes to the recipient,
    /// `ack_json` to the sender.
    pub async fn execute(
        &self,
        from: UserId,
        to: UserId,
        chat_json: &str,
        ack_json: &str,
    ) -> Result<DirectMessageOutcome, RepositoryError> {
        if self.directory.is_blocked(to, from).await? {
            tracing::debug!("Chat from {} to {} dropped: sender is blocked", from, to);
            return Ok(DirectMessageOutcome::Blocked);
        }

        let delivered = match self.registry.push_to(to, chat_json).await {
            Ok(()) => true,
            Err(PushError::NotConnected(_)) => {
                tracing::debug!("Chat recipient {} is offline", to);
                false
            }
            Err(PushError::SendFailed(user, e)) => {
                tracing::warn!("Failed to deliver chat to user {}: {}", user, e);
                false
            }
        };

        if let Err(e) = self.registry.push_to(from, ack_json).await {
            tracing::debug!("Could not acknowledge chat to sender {}: {}", from, e);
        }

        Ok(if delivered {
            DirectMessageOutcome::Delivered
        } else {
            DirectMessageOutcome::RecipientOffline
        })
    }
}
