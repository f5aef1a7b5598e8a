//! # wabridge Core
//!
//! Domain types, traits, and error definitions for the wabridge webhook
//! bridge. This crate has **no framework dependencies**: it defines the
//! domain model that the HTTP gateway, the platform channel, the reply
//! generators and the session stores implement against.
//!
//! ## Seams
//!
//! - [`Channel`]: delivers a reply back through the chat platform
//! - [`Responder`]: turns an inbound text into reply text
//! - [`SessionStore`]: maps a sender to a conversation handle

pub mod channel;
pub mod error;
pub mod message;
pub mod responder;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use channel::Channel;
pub use error::{Error, Result};
pub use message::{DeliveryReceipt, InboundMessage, OutboundMessage, SenderIdentity};
pub use responder::Responder;
pub use session::{SessionRecord, SessionStore};
