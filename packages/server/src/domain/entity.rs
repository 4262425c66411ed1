//! Domain entities: user profiles, channel membership records, persisted
//! channel messages, and the game invitation lifecycle.

use serde::{Deserialize, Serialize};

use super::value_object::{ChannelId, Timestamp, UserId};

/// User profile as exposed by the platform's user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Channel metadata as exposed by the platform's channel store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// Per (user, channel) membership record with the admin and mute sub-states.
///
/// Admin and mute are orthogonal axes, but the command layer never mutes an
/// admin, so `is_admin && is_muted` does not occur in practice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMembership {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub display_name: String,
    pub is_admin: bool,
    pub is_muted: bool,
    pub mute_end_time: Option<Timestamp>,
    pub joined_at: Timestamp,
}

impl ChannelMembership {
    /// Whether a set mute has run out. A mute without an end time never
    /// expires on its own.
    pub fn mute_expired(&self, now: Timestamp) -> bool {
        self.is_muted && self.mute_end_time.is_some_and(|end| end < now)
    }

    /// Whether the member is currently barred from posting.
    pub fn is_silenced(&self, now: Timestamp) -> bool {
        self.is_muted && !self.mute_expired(now)
    }
}

/// Channel message as persisted by the store, echoed back to members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChannelMessage {
    pub id: i64,
    pub channel_id: ChannelId,
    pub content: String,
    pub created_at: Timestamp,
    pub sender: UserProfile,
}

/// Resolution carried by a `game_invitation_response` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationResponse {
    Accepted,
    Rejected,
}

/// Lifecycle of a game invitation.
///
/// The status is monotonic: once resolved it never reverts to `Pending`,
/// and the first resolution sticks. Duplicate deliveries of the same
/// change merge to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    /// Merge an incoming status observation into the current one.
    /// Terminal states win over `Pending`; an already-terminal status is
    /// kept unchanged regardless of the incoming value.
    pub fn merge(self, incoming: InvitationStatus) -> InvitationStatus {
        if self.is_terminal() { self } else { incoming }
    }
}

impl From<InvitationResponse> for InvitationStatus {
    fn from(response: InvitationResponse) -> Self {
        match response {
            InvitationResponse::Accepted => InvitationStatus::Accepted,
            InvitationResponse::Rejected => InvitationStatus::Rejected,
        }
    }
}
