//! Conversion logic between domain entities and wire frame payloads.

use rally_shared::time::millis_to_rfc3339;

use crate::domain::entity;
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<entity::UserProfile> for dto::UserSummary {
    fn from(model: entity::UserProfile) -> Self {
        Self {
            id: model.id.value(),
            display_name: model.display_name,
            avatar_url: model.avatar_url,
        }
    }
}

impl From<entity::StoredChannelMessage> for dto::ChannelMessagePayload {
    fn from(model: entity::StoredChannelMessage) -> Self {
        Self {
            id: model.id,
            content: model.content,
            created_at: millis_to_rfc3339(model.created_at.value()),
            user: model.sender.into(),
        }
    }
}

impl From<entity::ChannelMembership> for dto::ChannelMemberPayload {
    fn from(model: entity::ChannelMembership) -> Self {
        Self {
            user_id: model.user_id.value(),
            display_name: model.display_name,
            avatar_url: None,
            is_admin: model.is_admin,
            is_muted: model.is_muted,
            mute_end_time: model.mute_end_time.map(|t| millis_to_rfc3339(t.value())),
            joined_at: millis_to_rfc3339(model.joined_at.value()),
        }
    }
}
