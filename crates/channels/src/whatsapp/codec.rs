//! WhatsApp Cloud API JSON envelopes.
//!
//! Inbound webhook events have the shape
//! `object / entry[] / changes[] / value / {messages[], contacts[], statuses[]}`.
//! Every field is optional here: classification decides what a payload
//! is, and extraction names the first missing path segment.

use serde::{Deserialize, Serialize};
use wabridge_core::error::ChannelError;
use wabridge_core::message::{InboundMessage, SenderIdentity};

// --- Inbound ---

/// A decoded webhook POST body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Source marker, `"whatsapp_business_account"` for real events
    #[serde(default)]
    pub object: Option<String>,

    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,

    #[serde(default)]
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,

    #[serde(default)]
    pub contacts: Vec<Contact>,

    #[serde(default)]
    pub messages: Vec<WaMessage>,

    /// Sent / delivered / read receipts
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: Option<String>,

    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaMessage {
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub text: Option<TextBody>,
}

impl WaMessage {
    /// `{}` or an object carrying none of the known fields.
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.id.is_none()
            && self.timestamp.is_none()
            && self.kind.is_none()
            && self.text.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// What an inbound event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Delivery/read receipt: acknowledge, do nothing else
    StatusUpdate,
    /// Carries at least one message
    Message,
    /// Valid JSON, but not a WhatsApp message shape
    Unrecognized,
}

impl WebhookEvent {
    /// Decode from an already-parsed JSON value.
    ///
    /// Fails when a known field has the wrong JSON type (e.g. `entry` is a
    /// string); callers treat that as an unrecognized event.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// `entry[0].changes[0].value`
    pub fn first_value(&self) -> Option<&ChangeValue> {
        self.entry.first()?.changes.first()?.value.as_ref()
    }

    pub fn is_status_update(&self) -> bool {
        self.first_value().is_some_and(|v| !v.statuses.is_empty())
    }

    /// Structural check: marker, entry, change, value and a non-empty
    /// first message are all present.
    pub fn is_message(&self) -> bool {
        self.object.as_deref().is_some_and(|o| !o.is_empty())
            && self
                .first_value()
                .and_then(|v| v.messages.first())
                .is_some_and(|m| !m.is_empty())
    }

    pub fn classify(&self) -> EventKind {
        if self.is_status_update() {
            EventKind::StatusUpdate
        } else if self.is_message() {
            EventKind::Message
        } else {
            EventKind::Unrecognized
        }
    }
}

/// Receipt check on the raw JSON, before any typed decoding.
///
/// A delivery receipt is acknowledged even when sibling fields do not fit
/// the event model.
pub fn is_status_update_value(value: &serde_json::Value) -> bool {
    value
        .pointer("/entry/0/changes/0/value/statuses")
        .and_then(|s| s.as_array())
        .is_some_and(|s| !s.is_empty())
}

fn missing(path: &str) -> ChannelError {
    ChannelError::InvalidPayload(path.to_string())
}

/// Extract sender id, display name and text from the first contact and
/// first message of a message event.
pub fn extract_inbound_message(event: &WebhookEvent) -> Result<InboundMessage, ChannelError> {
    let value = event
        .entry
        .first()
        .ok_or_else(|| missing("entry[0]"))?
        .changes
        .first()
        .ok_or_else(|| missing("entry[0].changes[0]"))?
        .value
        .as_ref()
        .ok_or_else(|| missing("entry[0].changes[0].value"))?;

    let contact = value.contacts.first().ok_or_else(|| missing("value.contacts[0]"))?;
    let id = contact
        .wa_id
        .clone()
        .ok_or_else(|| missing("value.contacts[0].wa_id"))?;
    let display_name = contact
        .profile
        .as_ref()
        .and_then(|p| p.name.clone())
        .ok_or_else(|| missing("value.contacts[0].profile.name"))?;

    let message = value.messages.first().ok_or_else(|| missing("value.messages[0]"))?;
    let text = message
        .text
        .as_ref()
        .map(|t| t.body.clone())
        .ok_or_else(|| missing("value.messages[0].text.body"))?;

    Ok(InboundMessage {
        sender: SenderIdentity { id, display_name },
        text,
        message_id: message.id.clone(),
    })
}

// --- Outbound ---

const MESSAGING_PRODUCT: &str = "whatsapp";

/// Body of a `/messages` POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Text(TextEnvelope),
    Template(TemplateEnvelope),
}

impl Envelope {
    pub fn recipient(&self) -> &str {
        match self {
            Self::Text(t) => &t.to,
            Self::Template(t) => &t.to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEnvelope {
    pub messaging_product: String,
    pub recipient_type: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEnvelope {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub template: Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLanguage {
    pub code: String,
}

/// Text message to one individual, link previews disabled.
pub fn build_text_envelope(recipient_id: &str, body: &str) -> Envelope {
    Envelope::Text(TextEnvelope {
        messaging_product: MESSAGING_PRODUCT.into(),
        recipient_type: "individual".into(),
        to: recipient_id.into(),
        kind: "text".into(),
        text: TextContent {
            preview_url: false,
            body: body.into(),
        },
    })
}

/// Pre-approved template message (e.g. `hello_world` / `en_US`).
pub fn build_template_envelope(recipient_id: &str, name: &str, language_code: &str) -> Envelope {
    Envelope::Template(TemplateEnvelope {
        messaging_product: MESSAGING_PRODUCT.into(),
        to: recipient_id.into(),
        kind: "template".into(),
        template: Template {
            name: name.into(),
            language: TemplateLanguage {
                code: language_code.into(),
            },
        },
    })
}

/// A minimal but complete inbound text-message event.
pub fn sample_event(sender_id: &str, sender_name: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                        "display_phone_number": "15550783881",
                        "phone_number_id": "106540352242922"
                    },
                    "contacts": [{
                        "profile": { "name": sender_name },
                        "wa_id": sender_id
                    }],
                    "messages": [{
                        "from": sender_id,
                        "id": format!("wamid.{sender_id}.1"),
                        "timestamp": "1700000000",
                        "type": "text",
                        "text": { "body": text }
                    }]
                }
            }]
        }]
    })
}

/// A delivery receipt event.
pub fn sample_status_event(recipient_id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "statuses": [{
                        "id": "wamid.status",
                        "recipient_id": recipient_id,
                        "status": status,
                        "timestamp": "1700000001"
                    }]
                }
            }]
        }]
    })
}
