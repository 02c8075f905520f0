//! Extraction cache keyed by document fingerprint.
//!
//! Avoids repeat summarization calls for identical documents. The backing
//! store is an opaque collaborator; the in-memory implementation here is
//! what the service ships with and what tests use.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use mindmap_core::ExtractionSnapshot;

/// How long a cached extraction stays valid.
pub const CACHE_TTL_HOURS: i64 = 24;

#[async_trait]
pub trait ExtractionCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<ExtractionSnapshot>;
    async fn set(&self, key: &str, snapshot: ExtractionSnapshot);
    async fn delete(&self, key: &str);
}

struct CacheEntry {
    snapshot: ExtractionSnapshot,
    stored_at: DateTime<Utc>,
}

/// In-memory implementation of ExtractionCache with lazy expiry: an entry
/// past its TTL is dropped on the read that finds it.
pub struct InMemoryExtractionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl InMemoryExtractionCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(CACHE_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }
}

impl Default for InMemoryExtractionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionCache for InMemoryExtractionCache {
    async fn get(&self, key: &str) -> Option<ExtractionSnapshot> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if Utc::now() - entry.stored_at <= self.ttl {
                    return Some(entry.snapshot.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, snapshot: ExtractionSnapshot) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                snapshot,
                stored_at: Utc::now(),
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::KeyPoint;

    fn snapshot() -> ExtractionSnapshot {
        ExtractionSnapshot {
            title: Some("Doc".into()),
            key_points: vec![KeyPoint::new("A")],
        }
    }

    #[tokio::test]
    async fn hit_and_delete() {
        let cache = InMemoryExtractionCache::new();
        cache.set("fp", snapshot()).await;
        assert_eq!(cache.get("fp").await, Some(snapshot()));

        cache.delete("fp").await;
        assert_eq!(cache.get("fp").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache = InMemoryExtractionCache::with_ttl(Duration::seconds(-1));
        cache.set("fp", snapshot()).await;
        assert_eq!(cache.get("fp").await, None);
        // the expired entry was evicted, not just hidden
        assert!(cache.entries.is_empty());
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = InMemoryExtractionCache::new();
        assert_eq!(cache.get("unknown").await, None);
    }
}
