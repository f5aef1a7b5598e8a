//! Bounded memory of recently seen inbound message ids.
//!
//! The platform redelivers webhooks it considers unacknowledged, so the same
//! `messages[0].id` can arrive more than once. Only the first sighting is
//! processed.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub struct RecentMessages {
    /// `None` when duplicate suppression is disabled
    seen: Option<Mutex<LruCache<String, ()>>>,
}

impl RecentMessages {
    /// Remember up to `capacity` ids, evicting the least recently seen.
    /// 0 disables the check.
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Record `id`; returns `false` when it was already seen.
    pub fn first_sighting(&self, id: &str) -> bool {
        let Some(seen) = &self.seen else {
            return true;
        };

        let mut seen = seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.put(id.to_string(), ()).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_are_rejected() {
        let recent = RecentMessages::new(8);
        assert!(recent.first_sighting("wamid.1"));
        assert!(!recent.first_sighting("wamid.1"));
        assert!(recent.first_sighting("wamid.2"));
    }

    #[test]
    fn oldest_id_is_evicted_at_capacity() {
        let recent = RecentMessages::new(2);
        assert!(recent.first_sighting("a"));
        assert!(recent.first_sighting("b"));
        assert!(recent.first_sighting("c"));
        // "a" fell out of the window
        assert!(recent.first_sighting("a"));
        assert!(!recent.first_sighting("c"));
    }

    #[test]
    fn repeat_refreshes_recency() {
        let recent = RecentMessages::new(2);
        assert!(recent.first_sighting("a"));
        assert!(recent.first_sighting("b"));
        assert!(!recent.first_sighting("a"));
        // "b" is now the least recent and is evicted instead of "a"
        assert!(recent.first_sighting("c"));
        assert!(!recent.first_sighting("a"));
        assert!(recent.first_sighting("b"));
    }

    #[test]
    fn zero_capacity_disables() {
        let recent = RecentMessages::new(0);
        assert!(recent.first_sighting("a"));
        assert!(recent.first_sighting("a"));
    }
}
