//! WhatsApp Cloud API channel adapter.
//!
//! - [`signature`]: `X-Hub-Signature-256` verification
//! - [`codec`]: inbound event decoding and outbound envelopes
//! - [`format`]: markdown → WhatsApp markup
//! - [`client`]: the `/messages` delivery client

pub mod client;
pub mod codec;
pub mod format;
pub mod signature;

pub use client::CloudApiClient;
pub use codec::{Envelope, EventKind, WebhookEvent};
pub use signature::SignatureVerifier;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use wabridge_config::WhatsAppConfig;
use wabridge_core::channel::Channel;
use wabridge_core::error::{ChannelError, DeliveryError};
use wabridge_core::message::{DeliveryReceipt, OutboundMessage};

/// Send-side settings for the WhatsApp channel.
#[derive(Clone)]
pub struct WhatsAppChannelConfig {
    /// Full `/messages` endpoint URL
    pub messages_url: String,
    pub access_token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for WhatsAppChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppChannelConfig")
            .field("messages_url", &self.messages_url)
            .field("access_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WhatsAppChannelConfig {
    /// Derive from the application config. Requires `ACCESS_TOKEN` and
    /// `PHONE_NUMBER_ID`.
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self, ChannelError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ChannelError::NotConfigured("ACCESS_TOKEN is not set".into()))?;
        let messages_url = config
            .messages_url()
            .ok_or_else(|| ChannelError::NotConfigured("PHONE_NUMBER_ID is not set".into()))?;

        Ok(Self {
            messages_url,
            access_token,
            timeout: Duration::from_secs(config.send_timeout_secs),
        })
    }
}

/// WhatsApp channel: delivers replies as text envelopes.
pub struct WhatsAppChannel {
    client: CloudApiClient,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppChannelConfig) -> Result<Self, ChannelError> {
        let client = CloudApiClient::new(config.messages_url, config.access_token, config.timeout)?;
        Ok(Self { client })
    }

    /// Send any envelope (text or template).
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<DeliveryReceipt, DeliveryError> {
        self.client.send_envelope(envelope).await
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        debug!(
            recipient = %message.recipient_id,
            content_len = message.body.len(),
            "WhatsApp send"
        );
        let envelope = codec::build_text_envelope(&message.recipient_id, &message.body);
        self.client.send_envelope(&envelope).await
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(!self.client.messages_url().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::client::test_support::spawn_send_api;
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn config_requires_send_credentials() {
        let mut wa = WhatsAppConfig::default();
        assert!(WhatsAppChannelConfig::from_config(&wa).is_err());

        wa.access_token = Some("EAAB".into());
        assert!(WhatsAppChannelConfig::from_config(&wa).is_err());

        wa.phone_number_id = Some("1098".into());
        let cfg = WhatsAppChannelConfig::from_config(&wa).unwrap();
        assert_eq!(cfg.messages_url, "https://graph.facebook.com/v18.0/1098/messages");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(!format!("{cfg:?}").contains("EAAB"));
    }

    #[tokio::test]
    async fn channel_sends_text_envelope() {
        let (url, captured) = spawn_send_api(StatusCode::OK).await;
        let ch = WhatsAppChannel::new(WhatsAppChannelConfig {
            messages_url: url,
            access_token: "tok".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        assert_eq!(ch.name(), "whatsapp");
        assert!(ch.health_check().await.unwrap());

        ch.send(&OutboundMessage::text("5511999999999", "HI THERE"))
            .await
            .unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].1["messaging_product"], "whatsapp");
        assert_eq!(captured[0].1["recipient_type"], "individual");
        assert_eq!(captured[0].1["type"], "text");
        assert_eq!(captured[0].1["text"]["body"], "HI THERE");
    }
}
