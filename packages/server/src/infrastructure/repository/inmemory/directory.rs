//! In-memory user directory and block-list store.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DirectoryRepository, RepositoryError, UserId, UserProfile};

use super::UserTable;

/// In-memory implementation of the directory collaborator.
pub struct InMemoryDirectoryRepository {
    users: UserTable,
    /// Directional block relationships as (blocker, blocked) pairs.
    blocks: Mutex<HashSet<(UserId, UserId)>>,
}

impl InMemoryDirectoryRepository {
    pub fn new(users: UserTable) -> Self {
        Self {
            users,
            blocks: Mutex::new(HashSet::new()),
        }
    }

    /// Insert or replace a user profile.
    pub async fn add_user(&self, profile: UserProfile) {
        let mut users = self.users.lock().await;
        users.insert(profile.id, profile);
    }

    /// Record that `blocker` has blocked `blocked`.
    pub async fn block(&self, blocker: UserId, blocked: UserId) {
        let mut blocks = self.blocks.lock().await;
        blocks.insert((blocker, blocked));
    }

    /// Remove a block relationship if present.
    pub async fn unblock(&self, blocker: UserId, blocked: UserId) {
        let mut blocks = self.blocks.lock().await;
        blocks.remove(&(blocker, blocked));
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let users = self.users.lock().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn is_blocked(&self, blocker: UserId, blocked: UserId) -> Result<bool, RepositoryError> {
        let blocks = self.blocks.lock().await;
        Ok(blocks.contains(&(blocker, blocked)))
    }
}
