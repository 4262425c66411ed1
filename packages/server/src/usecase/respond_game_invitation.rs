//! UseCase: game invitation response routing.
//!
//! The response is forwarded to the original inviter if reachable and
//! silently dropped otherwise. The relay does not retry or persist:
//! durability for the invitation lifecycle rests on the status metadata
//! the client patches into the message store over REST.

use std::sync::Arc;

use crate::domain::{PresenceRegistry, PushError, UserId};

/// Invitation response routing usecase.
pub struct RespondGameInvitationUseCase {
    registry: Arc<dyn PresenceRegistry>,
}

impl RespondGameInvitationUseCase {
    pub fn new(registry: Arc<dyn PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Forward the prebuilt response frame to the inviter. Returns
    /// whether it was delivered.
    pub async fn execute(&self, inviter: UserId, response_json: &str) -> bool {
        match self.registry.push_to(inviter, response_json).await {
            Ok(()) => true,
            Err(PushError::NotConnected(_)) => {
                tracing::debug!("Invitation response dropped: inviter {} offline", inviter);
                false
            }
            Err(PushError::SendFailed(user, e)) => {
                tracing::warn!("Failed to forward invitation response to {}: {}", user, e);
                false
            }
        }
    }
}
