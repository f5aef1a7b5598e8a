//! Session store implementations for wabridge.
//!
//! Each store maps a sender id to the conversation handle held by the
//! conversational backend. See [`wabridge_core::SessionStore`] for the
//! invariants.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemorySessionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;

use std::sync::Arc;
use wabridge_config::{SessionBackend, SessionsConfig};
use wabridge_core::SessionStore;
use wabridge_core::error::SessionError;

/// Open the store selected in the configuration.
pub async fn open_from_config(config: &SessionsConfig) -> Result<Arc<dyn SessionStore>, SessionError> {
    match config.backend {
        SessionBackend::InMemory => Ok(Arc::new(InMemorySessionStore::new())),
        #[cfg(feature = "sqlite")]
        SessionBackend::Sqlite => {
            let store = SqliteSessionStore::open(&config.resolved_path()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        SessionBackend::Sqlite => Err(SessionError::Storage(
            "built without the `sqlite` feature".into(),
        )),
    }
}
