//! Wire frames for the presence socket.
//!
//! One JSON object per frame, discriminated by the `type` field. Both
//! directions are closed tagged unions: a frame either parses into a known
//! variant or is rejected at the boundary with an explicit error branch.
//! Field names follow the platform's wire convention (camelCase).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::InvitationResponse;

/// Frame types accepted from clients.
const KNOWN_CLIENT_FRAME_TYPES: &[&str] = &[
    "online",
    "ping",
    "chat",
    "game_invitation",
    "game_invitation_response",
    "channel_message",
];

/// Why an inbound frame was rejected at the parse boundary.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Unparsable JSON or a known type with a missing/ill-typed field.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Well-formed JSON carrying a `type` tag outside the protocol.
    #[error("unrecognized frame type '{0}'")]
    UnrecognizedType(String),
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Presence announcement binding this connection to a user identity.
    Online { user_id: i64 },
    /// Liveness probe. The server does not answer; absence of pings is
    /// not monitored either, connection state is observed via transport
    /// events only.
    Ping,
    Chat {
        to: i64,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    GameInvitation {
        to: i64,
        from: i64,
        from_name: String,
        invitation_id: String,
    },
    GameInvitationResponse {
        to: i64,
        from: i64,
        invitation_id: String,
        response: InvitationResponse,
    },
    ChannelMessage {
        channel_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_message_id: Option<String>,
    },
}

/// Parse one inbound frame, distinguishing unknown `type` tags from
/// otherwise malformed payloads.
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, FrameError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
    let frame_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_owned);
    match serde_json::from_value::<ClientFrame>(value) {
        Ok(frame) => Ok(frame),
        Err(e) => match frame_type {
            Some(t) if !KNOWN_CLIENT_FRAME_TYPES.contains(&t.as_str()) => {
                Err(FrameError::UnrecognizedType(t))
            }
            _ => Err(FrameError::Malformed(e.to_string())),
        },
    }
}

/// Presence transition carried by a `presence` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Sender summary embedded in a channel message echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Persisted channel message as echoed to members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessagePayload {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub user: UserSummary,
}

/// Membership summary broadcast when a user joins a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMemberPayload {
    pub user_id: i64,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub is_muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_end_time: Option<String>,
    pub joined_at: String,
}

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Chat {
        from: i64,
        message: String,
        message_id: String,
    },
    /// Delivery acknowledgement echoed to the sender of a `chat` frame.
    MessageSent {
        to: i64,
        message_id: String,
        message: String,
    },
    GameInvitation {
        from: i64,
        from_name: String,
        invitation_id: String,
    },
    /// Delivery acknowledgement for a forwarded game invitation.
    GameInvitationSent { to: i64, invitation_id: String },
    GameInvitationResponse {
        from: i64,
        invitation_id: String,
        response: InvitationResponse,
    },
    ChannelMessage {
        channel_id: String,
        message: ChannelMessagePayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_message_id: Option<String>,
    },
    Presence { user_id: i64, status: PresenceStatus },
    ChannelUserJoined {
        channel_id: String,
        member: ChannelMemberPayload,
    },
    ChannelUserLeft {
        channel_id: String,
        user_id: i64,
        display_name: String,
    },
    ChannelUserKicked {
        channel_id: String,
        user_id: i64,
        display_name: String,
        admin_id: i64,
        admin_name: String,
    },
    ChannelUserMuted {
        channel_id: String,
        user_id: i64,
        display_name: String,
        admin_id: i64,
        admin_name: String,
        duration: i64,
        mute_end_time: String,
    },
    ChannelUserUnmuted {
        channel_id: String,
        user_id: i64,
        display_name: String,
        admin_id: i64,
        admin_name: String,
    },
    ChannelAdminChanged {
        channel_id: String,
        user_id: i64,
        display_name: String,
        is_admin: bool,
        changed_by: String,
    },
    YouWereKicked {
        channel_id: String,
        channel_name: String,
        admin_id: i64,
        admin_name: String,
    },
    YouWereMuted {
        channel_id: String,
        channel_name: String,
        admin_id: i64,
        admin_name: String,
        duration: i64,
        mute_end_time: String,
    },
    YouWereUnmuted {
        channel_id: String,
        channel_name: String,
        admin_id: i64,
        admin_name: String,
    },
}

impl ServerEvent {
    /// Serialize for the wire. These frames are plain data; serialization
    /// cannot fail.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

impl ClientFrame {
    /// Serialize for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

/// Parse one server frame on the client side.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, FrameError> {
    serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))
}
