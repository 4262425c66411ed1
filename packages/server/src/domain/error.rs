//! Error types for the domain layer.

use thiserror::Error;

use super::value_object::UserId;

/// Validation errors raised by value object constructors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must be positive, got {0}")]
    UserIdInvalid(i64),

    #[error("channel id must not be empty")]
    ChannelIdEmpty,

    #[error("channel id too long (max {max}, actual {actual})")]
    ChannelIdTooLong { max: usize, actual: usize },

    #[error("message content must not be empty")]
    MessageContentEmpty,

    #[error("message content too long (max {max}, actual {actual})")]
    MessageContentTooLong { max: usize, actual: usize },
}

/// Errors surfaced by the external store collaborators
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors surfaced by directed sends through the presence registry
#[derive(Debug, Clone, Error)]
pub enum PushError {
    /// The recipient has no live, writable connection. A normal condition,
    /// not a fault: offline peers catch up through the persisted store.
    #[error("user {0} is not connected")]
    NotConnected(UserId),

    #[error("failed to push to user {0}: {1}")]
    SendFailed(UserId, String),
}

/// Rule violations raised by channel moderation commands
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("user {0} is not a member of this channel")]
    NotMember(UserId),

    #[error("user {0} is not a channel admin")]
    NotAdmin(UserId),

    #[error("target user {0} is not a member of this channel")]
    TargetNotMember(UserId),

    #[error("target user {0} is a channel admin")]
    TargetIsAdmin(UserId),

    #[error("user {0} is already a member of this channel")]
    AlreadyMember(UserId),

    #[error("command must not target the issuing admin")]
    SelfTarget,

    #[error("admins cannot demote themselves")]
    SelfDemotionForbidden,

    #[error("target user {0} is not muted")]
    NotMuted(UserId),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("unknown channel")]
    UnknownChannel,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
