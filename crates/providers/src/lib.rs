//! Reply generators for wabridge.
//!
//! All responders implement the `wabridge_core::Responder` trait.
//! [`build_from_config`] selects one based on the configured kind.

pub mod assistant;
pub mod static_reply;

pub use assistant::{AssistantResponder, PollPolicy};
pub use static_reply::UppercaseResponder;

use std::sync::Arc;
use tracing::info;
use wabridge_config::{AppConfig, ResponderKind};
use wabridge_core::Responder;
use wabridge_core::error::ResponderError;

/// Build the responder selected in `config`.
///
/// The assistant responder opens the configured session store; the static
/// responder touches no storage.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Responder>, ResponderError> {
    let responder: Arc<dyn Responder> = match config.responder.kind {
        ResponderKind::Static => Arc::new(UppercaseResponder),
        ResponderKind::Assistant => {
            let sessions = wabridge_memory::open_from_config(&config.sessions).await?;
            info!(store = sessions.name(), "Session store ready");
            Arc::new(AssistantResponder::from_config(&config.assistant, sessions)?)
        }
    };

    info!(responder = responder.name(), "Responder selected");
    Ok(responder)
}
