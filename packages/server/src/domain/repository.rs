//! Repository traits for the external store collaborators.
//!
//! The relay never talks to the relational store directly. User lookup,
//! block relationships, channel membership state and message persistence
//! all sit behind these traits; the platform wires in its own backed
//! implementations, tests use the in-memory ones.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{ChannelInfo, ChannelMembership, StoredChannelMessage, UserProfile};
use super::error::RepositoryError;
use super::value_object::{ChannelId, MessageContent, Timestamp, UserId};

/// User directory and block-list collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Fetch a user profile by id.
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>, RepositoryError>;

    /// Whether `blocker` has blocked `blocked`. Blocking is directional;
    /// callers that need symmetry query both ways.
    async fn is_blocked(&self, blocker: UserId, blocked: UserId) -> Result<bool, RepositoryError>;
}

/// Channel membership, moderation state and message persistence collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn get_channel(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelInfo>, RepositoryError>;

    async fn get_membership(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelMembership>, RepositoryError>;

    /// All current members of a channel.
    async fn get_members(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Vec<ChannelMembership>, RepositoryError>;

    async fn add_member(&self, membership: ChannelMembership) -> Result<(), RepositoryError>;

    async fn remove_member(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), RepositoryError>;

    async fn set_mute(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
        mute_end_time: Timestamp,
    ) -> Result<(), RepositoryError>;

    async fn clear_mute(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), RepositoryError>;

    async fn set_admin(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
        is_admin: bool,
    ) -> Result<(), RepositoryError>;

    async fn count_admins(&self, channel_id: &ChannelId) -> Result<usize, RepositoryError>;

    /// The longest-standing member without admin rights, used to pick the
    /// successor when the sole admin leaves.
    async fn earliest_joined_non_admin(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelMembership>, RepositoryError>;

    /// Persist a channel message and return it as stored, including the
    /// sender's profile for the echo frame.
    async fn store_message(
        &self,
        sender: UserId,
        channel_id: &ChannelId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Result<StoredChannelMessage, RepositoryError>;

    /// Delete a channel together with all of its persisted messages.
    async fn delete_channel(&self, channel_id: &ChannelId) -> Result<(), RepositoryError>;

    /// Clear every mute whose end time has elapsed. Returns the affected
    /// (channel, user) pairs. Backs the periodic sweep; the lazy check on
    /// the message path does not depend on it.
    async fn sweep_expired_mutes(
        &self,
        now: Timestamp,
    ) -> Result<Vec<(ChannelId, UserId)>, RepositoryError>;
}
