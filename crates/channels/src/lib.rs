//! Chat channel implementations for wabridge.
//!
//! Available channels:
//! - **WhatsApp**: WhatsApp Cloud API (Graph API `/messages` endpoint),
//!   with webhook signature verification and the inbound/outbound JSON codec

pub mod whatsapp;

pub use whatsapp::{SignatureVerifier, WhatsAppChannel, WhatsAppChannelConfig};
