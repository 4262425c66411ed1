//! In-memory channel membership, moderation state and message store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChannelId, ChannelInfo, ChannelMembership, ChannelRepository, MessageContent, RepositoryError,
    StoredChannelMessage, Timestamp, UserId,
};

use super::UserTable;

#[derive(Default)]
struct ChannelStore {
    channels: HashMap<ChannelId, ChannelInfo>,
    members: HashMap<ChannelId, Vec<ChannelMembership>>,
    messages: HashMap<ChannelId, Vec<StoredChannelMessage>>,
    next_message_id: i64,
}

/// In-memory implementation of the channel collaborator.
pub struct InMemoryChannelRepository {
    users: UserTable,
    store: Mutex<ChannelStore>,
}

impl InMemoryChannelRepository {
    pub fn new(users: UserTable) -> Self {
        Self {
            users,
            store: Mutex::new(ChannelStore {
                next_message_id: 1,
                ..ChannelStore::default()
            }),
        }
    }

    /// Create an empty channel.
    pub async fn create_channel(&self, channel: ChannelInfo) {
        let mut store = self.store.lock().await;
        store.members.entry(channel.id.clone()).or_default();
        store.messages.entry(channel.id.clone()).or_default();
        store.channels.insert(channel.id.clone(), channel);
    }

    /// Number of persisted messages for a channel. Test support.
    pub async fn message_count(&self, channel_id: &ChannelId) -> usize {
        let store = self.store.lock().await;
        store.messages.get(channel_id).map_or(0, Vec::len)
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn get_channel(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelInfo>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.channels.get(channel_id).cloned())
    }

    async fn get_membership(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelMembership>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .members
            .get(channel_id)
            .and_then(|members| members.iter().find(|m| m.user_id == user_id).cloned()))
    }

    async fn get_members(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Vec<ChannelMembership>, RepositoryError> {
        let store = self.store.lock().await;
        let mut members = store.members.get(channel_id).cloned().unwrap_or_default();
        members.sort_by_key(|m| (m.joined_at, m.user_id));
        Ok(members)
    }

    async fn add_member(&self, membership: ChannelMembership) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        if !store.channels.contains_key(&membership.channel_id) {
            return Err(RepositoryError::NotFound);
        }
        let members = store.members.entry(membership.channel_id.clone()).or_default();
        if members.iter().any(|m| m.user_id == membership.user_id) {
            return Err(RepositoryError::Storage(format!(
                "user {} already a member of channel {}",
                membership.user_id, membership.channel_id
            )));
        }
        members.push(membership);
        Ok(())
    }

    async fn remove_member(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let members = store
            .members
            .get_mut(channel_id)
            .ok_or(RepositoryError::NotFound)?;
        let before = members.len();
        members.retain(|m| m.user_id != user_id);
        if members.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_mute(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
        mute_end_time: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let member = store
            .members
            .get_mut(channel_id)
            .and_then(|members| members.iter_mut().find(|m| m.user_id == user_id))
            .ok_or(RepositoryError::NotFound)?;
        member.is_muted = true;
        member.mute_end_time = Some(mute_end_time);
        Ok(())
    }

    async fn clear_mute(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let member = store
            .members
            .get_mut(channel_id)
            .and_then(|members| members.iter_mut().find(|m| m.user_id == user_id))
            .ok_or(RepositoryError::NotFound)?;
        member.is_muted = false;
        member.mute_end_time = None;
        Ok(())
    }

    async fn set_admin(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
        is_admin: bool,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let member = store
            .members
            .get_mut(channel_id)
            .and_then(|members| members.iter_mut().find(|m| m.user_id == user_id))
            .ok_or(RepositoryError::NotFound)?;
        member.is_admin = is_admin;
        Ok(())
    }

    async fn count_admins(&self, channel_id: &ChannelId) -> Result<usize, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .members
            .get(channel_id)
            .map_or(0, |members| members.iter().filter(|m| m.is_admin).count()))
    }

    async fn earliest_joined_non_admin(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelMembership>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.members.get(channel_id).and_then(|members| {
            members
                .iter()
                .filter(|m| !m.is_admin)
                .min_by_key(|m| (m.joined_at, m.user_id))
                .cloned()
        }))
    }

    async fn store_message(
        &self,
        sender: UserId,
        channel_id: &ChannelId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Result<StoredChannelMessage, RepositoryError> {
        let sender_profile = {
            let users = self.users.lock().await;
            users.get(&sender).cloned().ok_or(RepositoryError::NotFound)?
        };
        let mut store = self.store.lock().await;
        if !store.channels.contains_key(channel_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = store.next_message_id;
        store.next_message_id += 1;
        let message = StoredChannelMessage {
            id,
            channel_id: channel_id.clone(),
            content: content.into_string(),
            created_at,
            sender: sender_profile,
        };
        store
            .messages
            .entry(channel_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn delete_channel(&self, channel_id: &ChannelId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        store.channels.remove(channel_id);
        store.members.remove(channel_id);
        // Cascade: messages go with the channel.
        store.messages.remove(channel_id);
        Ok(())
    }

    async fn sweep_expired_mutes(
        &self,
        now: Timestamp,
    ) -> Result<Vec<(ChannelId, UserId)>, RepositoryError> {
        let mut store = self.store.lock().await;
        let mut cleared = Vec::new();
        for (channel_id, members) in store.members.iter_mut() {
            for member in members.iter_mut() {
                if member.mute_expired(now) {
                    member.is_muted = false;
                    member.mute_end_time = None;
                    cleared.push((channel_id.clone(), member.user_id));
                }
            }
        }
        Ok(cleared)
    }
}
