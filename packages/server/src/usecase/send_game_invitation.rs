//! UseCase: game invitation routing.
//!
//! Invitations ride the live connection only; there is no queueing in the
//! relay. The sender receives a delivery acknowledgement solely when the
//! invitation actually reached the target, so an unacknowledged invite
//! means non-delivery and the sender may retry.

use std::sync::Arc;

use crate::domain::{DirectoryRepository, PresenceRegistry, PushError, RepositoryError, UserId};

/// What happened to a routed game invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationDeliveryOutcome {
    /// The target blocks the inviter; nothing was sent to anyone.
    Blocked,
    /// Invitation delivered, acknowledgement pushed to the inviter.
    Delivered,
    /// Target unreachable; no acknowledgement.
    TargetOffline,
}

/// Game invitation routing usecase.
pub struct SendGameInvitationUseCase {
    registry: Arc<dyn PresenceRegistry>,
    directory: Arc<dyn DirectoryRepository>,
}

impl SendGameInvitationUseCase {
    pub fn new(
        registry: Arc<dyn PresenceRegistry>,
        directory: Arc<dyn DirectoryRepository>,
    ) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Route one invitation. `invite_json` goes to the target, `ack_json`
    /// to the inviter on successful delivery.
    pub async fn execute(
        &self,
        from: UserId,
        to: UserId,
        invite_json: &str,
        ack_json: &str,
    ) -> Result<InvitationDeliveryOutcome, RepositoryError> {
        if self.directory.is_blocked(to, from).await? {
            tracing::debug!(
                "Game invitation from {} to {} dropped: sender is blocked",
                from,
                to
            );
            return Ok(InvitationDeliveryOutcome::Blocked);
        }

        match self.registry.push_to(to, invite_json).await {
            Ok(()) => {
                if let Err(e) = self.registry.push_to(from, ack_json).await {
                    tracing::debug!("Could not acknowledge invitation to {}: {}", from, e);
                }
                Ok(InvitationDeliveryOutcome::Delivered)
            }
            Err(PushError::NotConnected(_)) => {
                tracing::debug!("Game invitation target {} is offline", to);
                Ok(InvitationDeliveryOutcome::TargetOffline)
            }
            Err(PushError::SendFailed(user, e)) => {
                tracing::warn!("Failed to deliver game invitation to {}: {}", user, e);
                Ok(InvitationDeliveryOutcome::TargetOffline)
            }
        }
    }
}
