//! Client-side game invitation lifecycle tracking.
//!
//! The relay forwards invitation responses at most once per change but a
//! status can still be observed twice (live push plus REST refresh).
//! The tracker merges observations monotonically: terminal states win
//! over `pending` and the first resolution sticks, so a late or
//! duplicated response frame never re-opens the response UI.

use std::collections::HashMap;

use rally_server::domain::{InvitationResponse, InvitationStatus};

/// Monotonic invitation status store keyed by invitation id.
#[derive(Debug, Default)]
pub struct InvitationTracker {
    statuses: HashMap<String, InvitationStatus>,
}

impl InvitationTracker {
    pub fn new() -> Self {
        Self {
            statuses: HashMap::new(),
        }
    }

    /// Record an incoming invitation as pending, keeping any resolution
    /// that already arrived.
    pub fn observe(&mut self, invitation_id: &str) -> InvitationStatus {
        *self
            .statuses
            .entry(invitation_id.to_string())
            .or_insert(InvitationStatus::Pending)
    }

    /// Merge a response observation. Returns whether the stored status
    /// changed; duplicates and conflicting late arrivals return false.
    pub fn apply_response(&mut self, invitation_id: &str, response: InvitationResponse) -> bool {
        let current = self
            .statuses
            .entry(invitation_id.to_string())
            .or_insert(InvitationStatus::Pending);
        let merged = current.merge(response.into());
        let changed = merged != *current;
        *current = merged;
        changed
    }

    pub fn status(&self, invitation_id: &str) -> Option<InvitationStatus> {
        self.statuses.get(invitation_id).copied()
    }
}
