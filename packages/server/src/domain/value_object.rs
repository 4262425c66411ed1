//! Value objects for the relay domain.
//!
//! Value objects are immutable and compared by value, not identity.
//! Constructors validate their input so the rest of the crate can rely
//! on well-formed values.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Stable numeric user reference, the key of the connection registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a new UserId. Identities are assigned by the platform's
    /// relational store and are strictly positive.
    pub fn new(id: i64) -> Result<Self, ValueObjectError> {
        if id <= 0 {
            return Err(ValueObjectError::UserIdInvalid(id));
        }
        Ok(Self(id))
    }

    /// Get the inner numeric value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel identifier value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a new ChannelId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ChannelIdEmpty);
        }
        let len = id.len();
        if len > 100 {
            return Err(ValueObjectError::ChannelIdTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message content value object with length validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageContent(String);

impl MessageContent {
    /// Create a new MessageContent.
    pub fn new(content: String) -> Result<Self, ValueObjectError> {
        if content.is_empty() {
            return Err(ValueObjectError::MessageContentEmpty);
        }
        let len = content.len();
        if len > 2000 {
            return Err(ValueObjectError::MessageContentTooLong {
                max: 2000,
                actual: len,
            });
        }
        Ok(Self(content))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds (UTC).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Get the inner millisecond value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Timestamp shifted forward by whole minutes.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + minutes * 60_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_positive_value() {
        // given:
        let raw = 42;

        // when:
        let user_id = UserId::new(raw);

        // then:
        assert_eq!(user_id.unwrap().value(), 42);
    }

    #[test]
    fn test_user_id_rejects_zero_and_negative() {
        // given:

        // when:
        let zero = UserId::new(0);
        let negative = UserId::new(-7);

        // then:
        assert_eq!(zero.unwrap_err(), ValueObjectError::UserIdInvalid(0));
        assert_eq!(negative.unwrap_err(), ValueObjectError::UserIdInvalid(-7));
    }

    #[test]
    fn test_channel_id_rejects_empty_string() {
        // given:
        let raw = String::new();

        // when:
        let result = ChannelId::new(raw);

        // then:
        assert_eq!(result.unwrap_err(), ValueObjectError::ChannelIdEmpty);
    }

    #[test]
    fn test_channel_id_rejects_overlong_string() {
        // given:
        let raw = "c".repeat(101);

        // when:
        let result = ChannelId::new(raw);

        // then:
        assert!(matches!(
            result.unwrap_err(),
            ValueObjectError::ChannelIdTooLong { max: 100, actual: 101 }
        ));
    }

    #[test]
    fn test_message_content_rejects_empty_and_overlong() {
        // given:
        let empty = String::new();
        let overlong = "x".repeat(2001);

        // when:
        let empty_result = MessageContent::new(empty);
        let overlong_result = MessageContent::new(overlong);

        // then:
        assert_eq!(
            empty_result.unwrap_err(),
            ValueObjectError::MessageContentEmpty
        );
        assert!(matches!(
            overlong_result.unwrap_err(),
            ValueObjectError::MessageContentTooLong { .. }
        ));
    }

    #[test]
    fn test_timestamp_plus_minutes() {
        // given:
        let start = Timestamp::new(1_000_000);

        // when:
        let shifted = start.plus_minutes(5);

        // then:
        assert_eq!(shifted.value(), 1_000_000 + 5 * 60_000);
        assert!(shifted > start);
    }
}
