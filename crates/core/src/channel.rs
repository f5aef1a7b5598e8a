//! Channel trait: the abstraction over the chat platform's send side.
//!
//! A Channel takes a reply produced by a [`Responder`](crate::Responder) and
//! delivers it to the platform. Implementations own the wire envelope,
//! authentication and timeout handling.

use async_trait::async_trait;

use crate::error::{ChannelError, DeliveryError};
use crate::message::{DeliveryReceipt, OutboundMessage};

/// The core Channel trait.
///
/// `send` performs a single attempt. Retry policy, if any, belongs to the
/// caller.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "whatsapp").
    fn name(&self) -> &str;

    /// Deliver a text reply.
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError>;

    /// Health check: is the channel configured and operational?
    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(DeliveryReceipt {
                status: 200,
                content_type: Some("application/json".into()),
                body: "{}".into(),
            })
        }
    }

    #[tokio::test]
    async fn default_health_check_is_ok() {
        let ch = RecordingChannel {
            sent: Mutex::new(vec![]),
        };
        assert!(ch.health_check().await.unwrap());

        let receipt = ch.send(&OutboundMessage::text("1", "x")).await.unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(ch.sent.lock().unwrap().len(), 1);
    }
}
