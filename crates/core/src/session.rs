//! Session store trait: sender id → conversation handle.
//!
//! Invariants every implementation upholds:
//! - at most one handle per sender id
//! - a stored handle is never overwritten
//! - [`SessionStore::put_if_absent`] is atomic per key, so two concurrent
//!   first-contact requests for the same sender agree on one handle

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// One stored sender → session mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub sender_id: String,
    pub session_handle: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Look up the handle stored for `sender_id`.
    async fn get(&self, sender_id: &str) -> Result<Option<String>, SessionError>;

    /// Store `handle` for `sender_id` unless one already exists.
    ///
    /// Returns the handle that is stored after the call: `handle` if this
    /// call won, or the pre-existing handle otherwise.
    async fn put_if_absent(&self, sender_id: &str, handle: &str) -> Result<String, SessionError>;

    /// All stored mappings, oldest first.
    async fn list(&self) -> Result<Vec<SessionRecord>, SessionError>;
}
