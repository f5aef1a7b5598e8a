//! Static responder: a pure text transform with no state or I/O.

use async_trait::async_trait;
use wabridge_core::error::ResponderError;
use wabridge_core::message::SenderIdentity;
use wabridge_core::responder::Responder;

/// Replies with the inbound text upper-cased.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseResponder;

#[async_trait]
impl Responder for UppercaseResponder {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(
        &self,
        text: &str,
        _sender: &SenderIdentity,
    ) -> Result<String, ResponderError> {
        Ok(text.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uppercases_text() {
        let sender = SenderIdentity::new("1", "Alice");
        let reply = UppercaseResponder.generate("hello, wörld", &sender).await.unwrap();
        assert_eq!(reply, "HELLO, WÖRLD");
        assert!(!UppercaseResponder.emits_markdown());
    }
}
