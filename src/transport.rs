//! Delivery boundary between the pipeline and the hosting chat framework.
//!
//! The pipeline never talks to a chat platform directly. Hosts hand it an
//! [`InboundMessage`] and a [`ChatTransport`] that can send and delete
//! messages; everything platform-specific stays behind that trait.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::reply::ReplyUnit;

/// Chat platform an inbound message came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    OneBot,
    Qq,
    Telegram,
    Discord,
    Console,
    Other(String),
}

impl Platform {
    /// Parses a platform identifier (case-insensitive).
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "onebot" => Self::OneBot,
            "qq" => Self::Qq,
            "telegram" => Self::Telegram,
            "discord" => Self::Discord,
            "console" => Self::Console,
            _ => Self::Other(id.trim().to_string()),
        }
    }

    /// Returns the platform identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::OneBot => "onebot",
            Self::Qq => "qq",
            Self::Telegram => "telegram",
            Self::Discord => "discord",
            Self::Console => "console",
            Self::Other(id) => id,
        }
    }

    /// Returns true when the platform can render forwarded message bundles.
    #[must_use]
    pub fn supports_forward(&self) -> bool {
        matches!(self, Self::OneBot | Self::Qq)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One element of an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSegment {
    Text(String),
    Image { url: String },
    Mention { user_id: String },
}

/// A message received from the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Conversation the message belongs to; replies go back here.
    pub session_id: String,
    /// Host-assigned id of the message, used for quoting.
    pub message_id: Option<String>,
    /// Originating platform.
    pub platform: Platform,
    /// Message content in order.
    pub segments: Vec<MessageSegment>,
}

impl InboundMessage {
    /// Creates a single-text-segment message.
    #[must_use]
    pub fn text(session_id: impl Into<String>, platform: Platform, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: None,
            platform,
            segments: vec![MessageSegment::Text(text.into())],
        }
    }

    /// Concatenates all text segments.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                MessageSegment::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Host-assigned identifier of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// Errors reported by a [`ChatTransport`].
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The platform rejected or failed to deliver a message
    #[error("failed to send to session '{session}': {reason}")]
    SendFailed {
        /// Target session
        session: String,
        /// Platform-reported reason
        reason: String,
    },

    /// A previously sent message could not be removed
    #[error("failed to delete message '{message_id}': {reason}")]
    DeleteFailed {
        /// Message that was not deleted
        message_id: String,
        /// Platform-reported reason
        reason: String,
    },
}

impl TransportError {
    /// Creates a `SendFailed` error.
    #[must_use]
    pub fn send_failed(session: &str, reason: &str) -> Self {
        Self::SendFailed {
            session: session.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `DeleteFailed` error.
    #[must_use]
    pub fn delete_failed(message_id: &str, reason: &str) -> Self {
        Self::DeleteFailed {
            message_id: message_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Sends and retracts messages on behalf of the pipeline.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends one reply unit to the conversation of `origin`.
    async fn send(
        &self,
        origin: &InboundMessage,
        unit: &ReplyUnit,
    ) -> Result<MessageId, TransportError>;

    /// Deletes a message previously returned by [`ChatTransport::send`].
    async fn delete(&self, origin: &InboundMessage, id: &MessageId) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip_ids() {
        assert_eq!(Platform::from_id("OneBot"), Platform::OneBot);
        assert_eq!(Platform::from_id("qq").id(), "qq");
        assert_eq!(
            Platform::from_id("matrix"),
            Platform::Other("matrix".to_string())
        );
    }

    #[test]
    fn test_platform_forward_support() {
        assert!(Platform::OneBot.supports_forward());
        assert!(Platform::Qq.supports_forward());
        assert!(!Platform::Telegram.supports_forward());
        assert!(!Platform::Other("slack".to_string()).supports_forward());
    }

    #[test]
    fn test_plain_text_concatenates_text_segments() {
        let message = InboundMessage {
            session_id: "s".to_string(),
            message_id: None,
            platform: Platform::Console,
            segments: vec![
                MessageSegment::Text("magnet:?xt=urn:".to_string()),
                MessageSegment::Mention {
                    user_id: "42".to_string(),
                },
                MessageSegment::Text("btih:abc".to_string()),
                MessageSegment::Image {
                    url: "https://img".to_string(),
                },
            ],
        };
        assert_eq!(message.plain_text(), "magnet:?xt=urn:btih:abc");
    }

    #[test]
    fn test_transport_error_messages() {
        let err = TransportError::send_failed("group-1", "muted");
        assert!(err.to_string().contains("group-1"));
        assert!(err.to_string().contains("muted"));
        let err = TransportError::delete_failed("m-9", "gone");
        assert!(err.to_string().contains("m-9"));
    }
}
