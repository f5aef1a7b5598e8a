//! Responder trait: turns an inbound message into reply text.

use async_trait::async_trait;

use crate::error::ResponderError;
use crate::message::SenderIdentity;

/// Produces the reply for one inbound text message.
///
/// Implementations range from pure text transforms to stateful
/// conversational backends keyed by [`SenderIdentity::id`].
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name used in logs and diagnostics (e.g., "static", "assistant").
    fn name(&self) -> &str;

    /// Generate the reply text for `text` sent by `sender`.
    async fn generate(&self, text: &str, sender: &SenderIdentity)
    -> Result<String, ResponderError>;

    /// Whether replies use generic markdown (`**bold**`, citation markers)
    /// that must be rewritten for the target platform before delivery.
    fn emits_markdown(&self) -> bool {
        false
    }
}
