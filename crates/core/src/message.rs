//! Message types exchanged between the gateway, generators and channels.

use serde::{Deserialize, Serialize};

/// A chat-platform end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Stable platform identifier (the WhatsApp `wa_id`)
    pub id: String,

    /// Profile display name
    pub display_name: String,
}

impl SenderIdentity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A text message extracted from an inbound webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: SenderIdentity,

    /// The text body
    pub text: String,

    /// Platform message id, when the event carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// A text reply to be delivered through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn text(recipient_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            body: body.into(),
        }
    }
}

/// The raw response of a successful send, retained for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_serialization_skips_missing_id() {
        let msg = InboundMessage {
            sender: SenderIdentity::new("5511999999999", "Alice"),
            text: "hello".into(),
            message_id: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("message_id"));
        assert!(json.contains("Alice"));
    }

    #[test]
    fn outbound_text_constructor() {
        let msg = OutboundMessage::text("123", "HI");
        assert_eq!(msg.recipient_id, "123");
        assert_eq!(msg.body, "HI");
    }
}
