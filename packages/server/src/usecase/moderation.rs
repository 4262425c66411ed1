//! UseCase: channel moderation state machine.
//!
//! Membership transitions (join, leave, kick, mute, unmute, promote,
//! demote) triggered by moderation commands. Every transition that
//! affects a connected member emits a directed personal event to that
//! member and a broadcast to the remaining channel members, both through
//! the presence registry's send primitives; the moderation layer never
//! touches registry internals.
//!
//! Command-layer invariants: kick/mute/unmute/promote/demote require the
//! actor to hold admin on the channel; admins cannot be kicked or muted;
//! kick and mute never target the actor; self-demotion is forbidden. The
//! last member to leave (or be kicked) takes the channel and its message
//! history with them, and a sole departing admin hands the role to the
//! earliest-joined non-admin first.

use std::sync::Arc;

use rally_shared::time::{millis_to_rfc3339, Clock};

use crate::domain::{
    ChannelId, ChannelInfo, ChannelMembership, ChannelRepository, DirectoryRepository,
    ModerationError, PresenceRegistry, PushError, Timestamp, UserId,
};
use crate::infrastructure::dto::websocket::{ChannelMemberPayload, ServerEvent};

/// Channel moderation usecase.
pub struct ChannelModerationUseCase {
    registry: Arc<dyn PresenceRegistry>,
    channels: Arc<dyn ChannelRepository>,
    directory: Arc<dyn DirectoryRepository>,
    clock: Arc<dyn Clock>,
}

impl ChannelModerationUseCase {
    pub fn new(
        registry: Arc<dyn PresenceRegistry>,
        channels: Arc<dyn ChannelRepository>,
        directory: Arc<dyn DirectoryRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            channels,
            directory,
            clock,
        }
    }

    /// Add `user_id` to the channel. The first member of an empty channel
    /// becomes its admin. All current members, the newcomer included, are
    /// notified.
    pub async fn join(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), ModerationError> {
        let channel = self.require_channel(channel_id).await?;
        if self
            .channels
            .get_membership(user_id, channel_id)
            .await?
            .is_some()
        {
            return Err(ModerationError::AlreadyMember(user_id));
        }
        let profile = self
            .directory
            .get_user(user_id)
            .await?
            .ok_or(ModerationError::UnknownUser(user_id))?;

        let is_first_member = self.channels.get_members(channel_id).await?.is_empty();
        let membership = ChannelMembership {
            user_id,
            channel_id: channel_id.clone(),
            display_name: profile.display_name.clone(),
            is_admin: is_first_member,
            is_muted: false,
            mute_end_time: None,
            joined_at: Timestamp::new(self.clock.now_millis()),
        };
        self.channels.add_member(membership.clone()).await?;

        let members = self.channels.get_members(channel_id).await?;
        let mut payload: ChannelMemberPayload = membership.into();
        payload.avatar_url = profile.avatar_url;
        let event = ServerEvent::ChannelUserJoined {
            channel_id: channel.id.as_str().to_string(),
            member: payload,
        };
        self.registry
            .fan_out(&member_ids(&members), &event.to_json())
            .await;
        tracing::info!("User {} joined channel {}", user_id, channel_id);
        Ok(())
    }

    /// Remove `user_id` from the channel at their own request. A sole
    /// departing admin promotes the earliest-joined non-admin first; the
    /// last member leaving deletes the channel and its messages.
    pub async fn leave(
        &self,
        user_id: UserId,
        channel_id: &ChannelId,
    ) -> Result<(), ModerationError> {
        let membership = self
            .channels
            .get_membership(user_id, channel_id)
            .await?
            .ok_or(ModerationError::NotMember(user_id))?;

        let mut promoted: Option<ChannelMembership> = None;
        if membership.is_admin && self.channels.count_admins(channel_id).await? == 1 {
            if let Some(successor) = self.channels.earliest_joined_non_admin(channel_id).await? {
                self.channels
                    .set_admin(successor.user_id, channel_id, true)
                    .await?;
                promoted = Some(successor);
            }
        }

        self.channels.remove_member(user_id, channel_id).await?;

        let remaining = self.channels.get_members(channel_id).await?;
        if remaining.is_empty() {
            self.channels.delete_channel(channel_id).await?;
            tracing::info!(
                "Channel {} deleted after its last member {} left",
                channel_id,
                user_id
            );
            return Ok(());
        }

        let targets = member_ids(&remaining);
        if let Some(successor) = promoted {
            let admin_event = ServerEvent::ChannelAdminChanged {
                channel_id: channel_id.as_str().to_string(),
                user_id: successor.user_id.value(),
                display_name: successor.display_name,
                is_admin: true,
                changed_by: membership.display_name.clone(),
            };
            self.registry
                .fan_out(&targets, &admin_event.to_json())
                .await;
        }
        let left_event = ServerEvent::ChannelUserLeft {
            channel_id: channel_id.as_str().to_string(),
            user_id: user_id.value(),
            display_name: membership.display_name,
        };
        self.registry.fan_out(&targets, &left_event.to_json()).await;
        tracing::info!("User {} left channel {}", user_id, channel_id);
        Ok(())
    }

    /// Remove `target` from the channel by admin decision.
    pub async fn kick(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
    ) -> Result<(), ModerationError> {
        let requester = self.require_admin(actor, channel_id).await?;
        if target == actor {
            return Err(ModerationError::SelfTarget);
        }
        let target_membership = self
            .channels
            .get_membership(target, channel_id)
            .await?
            .ok_or(ModerationError::TargetNotMember(target))?;
        if target_membership.is_admin {
            return Err(ModerationError::TargetIsAdmin(target));
        }

        // Channel metadata is read before the removal; the directed frame
        // still needs the name if the deletion cascade runs.
        let channel = self.require_channel(channel_id).await?;
        self.channels.remove_member(target, channel_id).await?;

        let remaining = self.channels.get_members(channel_id).await?;
        if remaining.is_empty() {
            self.channels.delete_channel(channel_id).await?;
        } else {
            let event = ServerEvent::ChannelUserKicked {
                channel_id: channel_id.as_str().to_string(),
                user_id: target.value(),
                display_name: target_membership.display_name.clone(),
                admin_id: actor.value(),
                admin_name: requester.display_name.clone(),
            };
            self.registry
                .fan_out(&member_ids(&remaining), &event.to_json())
                .await;
        }

        let directed = ServerEvent::YouWereKicked {
            channel_id: channel_id.as_str().to_string(),
            channel_name: channel.name,
            admin_id: actor.value(),
            admin_name: requester.display_name,
        };
        self.push_directed(target, &directed).await;
        tracing::info!(
            "User {} kicked from channel {} by admin {}",
            target,
            channel_id,
            actor
        );
        Ok(())
    }

    /// Mute `target` for `duration_minutes`.
    pub async fn mute(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
        duration_minutes: i64,
    ) -> Result<(), ModerationError> {
        let requester = self.require_admin(actor, channel_id).await?;
        if target == actor {
            return Err(ModerationError::SelfTarget);
        }
        let target_membership = self
            .channels
            .get_membership(target, channel_id)
            .await?
            .ok_or(ModerationError::TargetNotMember(target))?;
        if target_membership.is_admin {
            return Err(ModerationError::TargetIsAdmin(target));
        }

        let channel = self.require_channel(channel_id).await?;
        let mute_end = Timestamp::new(self.clock.now_millis()).plus_minutes(duration_minutes);
        self.channels.set_mute(target, channel_id, mute_end).await?;

        let mute_end_rfc3339 = millis_to_rfc3339(mute_end.value());
        let others = self.members_except(channel_id, target).await?;
        let event = ServerEvent::ChannelUserMuted {
            channel_id: channel_id.as_str().to_string(),
            user_id: target.value(),
            display_name: target_membership.display_name.clone(),
            admin_id: actor.value(),
            admin_name: requester.display_name.clone(),
            duration: duration_minutes,
            mute_end_time: mute_end_rfc3339.clone(),
        };
        self.registry.fan_out(&others, &event.to_json()).await;

        let directed = ServerEvent::YouWereMuted {
            channel_id: channel_id.as_str().to_string(),
            channel_name: channel.name,
            admin_id: actor.value(),
            admin_name: requester.display_name,
            duration: duration_minutes,
            mute_end_time: mute_end_rfc3339,
        };
        self.push_directed(target, &directed).await;
        tracing::info!(
            "User {} muted in channel {} for {} minutes by admin {}",
            target,
            channel_id,
            duration_minutes,
            actor
        );
        Ok(())
    }

    /// Lift `target`'s mute ahead of its end time.
    pub async fn unmute(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
    ) -> Result<(), ModerationError> {
        let requester = self.require_admin(actor, channel_id).await?;
        let target_membership = self
            .channels
            .get_membership(target, channel_id)
            .await?
            .ok_or(ModerationError::TargetNotMember(target))?;
        if !target_membership.is_muted {
            return Err(ModerationError::NotMuted(target));
        }

        let channel = self.require_channel(channel_id).await?;
        self.channels.clear_mute(target, channel_id).await?;

        let others = self.members_except(channel_id, target).await?;
        let event = ServerEvent::ChannelUserUnmuted {
            channel_id: channel_id.as_str().to_string(),
            user_id: target.value(),
            display_name: target_membership.display_name.clone(),
            admin_id: actor.value(),
            admin_name: requester.display_name.clone(),
        };
        self.registry.fan_out(&others, &event.to_json()).await;

        let directed = ServerEvent::YouWereUnmuted {
            channel_id: channel_id.as_str().to_string(),
            channel_name: channel.name,
            admin_id: actor.value(),
            admin_name: requester.display_name,
        };
        self.push_directed(target, &directed).await;
        tracing::info!(
            "User {} unmuted in channel {} by admin {}",
            target,
            channel_id,
            actor
        );
        Ok(())
    }

    /// Grant admin to `target`.
    pub async fn promote(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
    ) -> Result<(), ModerationError> {
        self.toggle_admin(actor, channel_id, target, true).await
    }

    /// Revoke `target`'s admin. Admins cannot demote themselves.
    pub async fn demote(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
    ) -> Result<(), ModerationError> {
        if target == actor {
            return Err(ModerationError::SelfDemotionForbidden);
        }
        self.toggle_admin(actor, channel_id, target, false).await
    }

    async fn toggle_admin(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
        target: UserId,
        is_admin: bool,
    ) -> Result<(), ModerationError> {
        let requester = self.require_admin(actor, channel_id).await?;
        let target_membership = self
            .channels
            .get_membership(target, channel_id)
            .await?
            .ok_or(ModerationError::TargetNotMember(target))?;

        self.channels
            .set_admin(target, channel_id, is_admin)
            .await?;

        let members = self.channels.get_members(channel_id).await?;
        let event = ServerEvent::ChannelAdminChanged {
            channel_id: channel_id.as_str().to_string(),
            user_id: target.value(),
            display_name: target_membership.display_name,
            is_admin,
            changed_by: requester.display_name,
        };
        self.registry
            .fan_out(&member_ids(&members), &event.to_json())
            .await;
        tracing::info!(
            "User {} admin={} in channel {} (changed by {})",
            target,
            is_admin,
            channel_id,
            actor
        );
        Ok(())
    }

    async fn require_admin(
        &self,
        actor: UserId,
        channel_id: &ChannelId,
    ) -> Result<ChannelMembership, ModerationError> {
        let membership = self
            .channels
            .get_membership(actor, channel_id)
            .await?
            .ok_or(ModerationError::NotMember(actor))?;
        if !membership.is_admin {
            return Err(ModerationError::NotAdmin(actor));
        }
        Ok(membership)
    }

    async fn require_channel(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelInfo, ModerationError> {
        self.channels
            .get_channel(channel_id)
            .await?
            .ok_or(ModerationError::UnknownChannel)
    }

    async fn members_except(
        &self,
        channel_id: &ChannelId,
        excluded: UserId,
    ) -> Result<Vec<UserId>, ModerationError> {
        Ok(self
            .channels
            .get_members(channel_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .filter(|id| *id != excluded)
            .collect())
    }

    async fn push_directed(&self, target: UserId, event: &ServerEvent) {
        match self.registry.push_to(target, &event.to_json()).await {
            Ok(()) => {}
            Err(PushError::NotConnected(_)) => {
                tracing::debug!("Moderation notice to offline user {} skipped", target);
            }
            Err(PushError::SendFailed(user, e)) => {
                tracing::warn!("Failed to push moderation notice to {}: {}", user, e);
            }
        }
    }
}

fn member_ids(members: &[ChannelMembership]) -> Vec<UserId> {
    members.iter().map(|m| m.user_id).collect()
}
