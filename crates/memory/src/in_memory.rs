//! In-memory session store: useful for testing and ephemeral deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use wabridge_core::error::SessionError;
use wabridge_core::session::{SessionRecord, SessionStore};

/// Sessions held in a map behind an async RwLock.
///
/// `put_if_absent` runs under the write lock, which makes it atomic.
/// Lookups only take the read lock, so senders never wait on each other
/// except during a first-contact insert.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, sender_id: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(sender_id)
            .map(|r| r.session_handle.clone()))
    }

    async fn put_if_absent(&self, sender_id: &str, handle: &str) -> Result<String, SessionError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .entry(sender_id.to_string())
            .or_insert_with(|| SessionRecord {
                sender_id: sender_id.to_string(),
                session_handle: handle.to_string(),
                created_at: Utc::now(),
            });
        Ok(record.session_handle.clone())
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let mut records: Vec<SessionRecord> =
            self.sessions.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("5511").await.unwrap(), None);
    }

    #[tokio::test]
    async fn first_handle_wins() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.put_if_absent("5511", "thread_a").await.unwrap(), "thread_a");
        assert_eq!(store.put_if_absent("5511", "thread_b").await.unwrap(), "thread_a");
        assert_eq!(store.get("5511").await.unwrap().as_deref(), Some("thread_a"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn senders_are_independent() {
        let store = InMemorySessionStore::new();
        store.put_if_absent("alice", "thread_a").await.unwrap();
        store.put_if_absent("bob", "thread_b").await.unwrap();
        assert_eq!(store.get("bob").await.unwrap().as_deref(), Some("thread_b"));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_contact_agrees_on_one_handle() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.put_if_absent("same-sender", &format!("thread_{i}")).await.unwrap()
            }));
        }

        let mut winners = Vec::new();
        for t in tasks {
            winners.push(t.await.unwrap());
        }
        winners.dedup();
        assert_eq!(winners.len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
