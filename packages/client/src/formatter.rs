//! Message formatting utilities for terminal display.

use chrono::DateTime;

use rally_server::infrastructure::dto::websocket::{PresenceStatus, ServerEvent};

/// Shorten an RFC 3339 timestamp to a wall-clock display, falling back
/// to the raw string when it does not parse.
fn short_time(rfc3339: &str) -> String {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| rfc3339.to_string())
}

/// Formatter turning server events into display lines.
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format one server event for the terminal.
    pub fn format_event(event: &ServerEvent) -> String {
        match event {
            ServerEvent::Chat {
                from,
                message,
                message_id: _,
            } => {
                format!("\n[chat] user {}: {}\n", from, message)
            }
            ServerEvent::MessageSent { to, message, .. } => {
                format!("\n[sent] to user {}: {}\n", to, message)
            }
            ServerEvent::GameInvitation {
                from, from_name, invitation_id,
            } => {
                format!(
                    "\n[invite] {} (user {}) challenges you to a match ({})\n",
                    from_name, from, invitation_id
                )
            }
            ServerEvent::GameInvitationSent { to, invitation_id } => {
                format!("\n[invite] delivered to user {} ({})\n", to, invitation_id)
            }
            ServerEvent::GameInvitationResponse {
                from,
                invitation_id,
                response,
            } => {
                format!(
                    "\n[invite] user {} answered {:?} ({})\n",
                    from, response, invitation_id
                )
            }
            ServerEvent::ChannelMessage {
                channel_id,
                message,
                ..
            } => {
                format!(
                    "\n[#{}] {} at {}: {}\n",
                    channel_id,
                    message.user.display_name,
                    short_time(&message.created_at),
                    message.content
                )
            }
            ServerEvent::Presence { user_id, status } => {
                let word = match status {
                    PresenceStatus::Online => "online",
                    PresenceStatus::Offline => "offline",
                };
                format!("\n[presence] user {} is {}\n", user_id, word)
            }
            ServerEvent::ChannelUserJoined { channel_id, member } => {
                format!("\n[#{}] {} joined\n", channel_id, member.display_name)
            }
            ServerEvent::ChannelUserLeft {
                channel_id,
                display_name,
                ..
            } => {
                format!("\n[#{}] {} left\n", channel_id, display_name)
            }
            ServerEvent::ChannelUserKicked {
                channel_id,
                display_name,
                admin_name,
                ..
            } => {
                format!(
                    "\n[#{}] {} was kicked by {}\n",
                    channel_id, display_name, admin_name
                )
            }
            ServerEvent::ChannelUserMuted {
                channel_id,
                display_name,
                duration,
                ..
            } => {
                format!(
                    "\n[#{}] {} was muted for {} minutes\n",
                    channel_id, display_name, duration
                )
            }
            ServerEvent::ChannelUserUnmuted {
                channel_id,
                display_name,
                ..
            } => {
                format!("\n[#{}] {} was unmuted\n", channel_id, display_name)
            }
            ServerEvent::ChannelAdminChanged {
                channel_id,
                display_name,
                is_admin,
                changed_by,
                ..
            } => {
                let verb = if *is_admin { "promoted" } else { "demoted" };
                format!(
                    "\n[#{}] {} was {} by {}\n",
                    channel_id, display_name, verb, changed_by
                )
            }
            ServerEvent::YouWereKicked {
                channel_name,
                admin_name,
                ..
            } => {
                format!(
                    "\n[!] You were kicked from '{}' by {}\n",
                    channel_name, admin_name
                )
            }
            ServerEvent::YouWereMuted {
                channel_name,
                admin_name,
                duration,
                ..
            } => {
                format!(
                    "\n[!] You were muted in '{}' by {} for {} minutes\n",
                    channel_name, admin_name, duration
                )
            }
            ServerEvent::YouWereUnmuted {
                channel_name,
                admin_name,
                ..
            } => {
                format!(
                    "\n[!] You were unmuted in '{}' by {}\n",
                    channel_name, admin_name
                )
            }
        }
    }
}
