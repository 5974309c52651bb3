//! Cache storage.
//!
//! `CacheStore` is the seam for external backends; `LruStore` is the
//! in-process default, bounded by entry count and aware of the TTL so it can
//! sweep stale entries on demand.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use agentkit_contracts::error::{ToolkitError, ToolkitResult};

/// One stored tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub result: Value,
    /// When the result was produced.
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, result: Value) -> Self {
        Self {
            key: key.into(),
            result,
            stored_at: Instant::now(),
        }
    }

    /// Whether the entry is still younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> ToolkitResult<Option<CacheEntry>>;

    /// Insert or replace the entry under `entry.key`.
    async fn set(&self, entry: CacheEntry) -> ToolkitResult<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> ToolkitResult<bool>;

    async fn clear(&self) -> ToolkitResult<()>;

    async fn len(&self) -> ToolkitResult<usize>;
}

/// Least-recently-used store holding at most `max_size` entries.
pub struct LruStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl LruStore {
    pub fn new(max_size: usize, ttl: Duration) -> ToolkitResult<Self> {
        let capacity = NonZeroUsize::new(max_size).ok_or_else(|| ToolkitError::Config {
            reason: "cache max_size must be at least 1".to_string(),
        })?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> ToolkitResult<Vec<String>> {
        Ok(self.lock()?.iter().map(|(k, _)| k.clone()).collect())
    }

    /// Remove every entry older than the TTL; returns how many were removed.
    pub fn cleanup(&self) -> ToolkitResult<usize> {
        let mut entries = self.lock()?;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(self.ttl))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        if !expired.is_empty() {
            debug!(removed = expired.len(), "expired cache entries swept");
        }
        Ok(expired.len())
    }

    fn lock(&self) -> ToolkitResult<MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.entries.lock().map_err(|_| ToolkitError::Storage {
            reason: "cache store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl CacheStore for LruStore {
    async fn get(&self, key: &str) -> ToolkitResult<Option<CacheEntry>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, entry: CacheEntry) -> ToolkitResult<()> {
        self.lock()?.put(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ToolkitResult<bool> {
        Ok(self.lock()?.pop(key).is_some())
    }

    async fn clear(&self) -> ToolkitResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn len(&self) -> ToolkitResult<usize> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = LruStore::new(2, Duration::from_secs(60)).unwrap();
        store.set(CacheEntry::new("a", json!(1))).await.unwrap();
        store.set(CacheEntry::new("b", json!(2))).await.unwrap();

        // Touch "a" so "b" becomes the eviction candidate.
        store.get("a").await.unwrap();
        store.set(CacheEntry::new("c", json!(3))).await.unwrap();

        assert_eq!(store.keys().unwrap(), vec!["c", "a"]);
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_only_expired_entries() {
        let store = LruStore::new(10, Duration::from_secs(60)).unwrap();
        store.set(CacheEntry::new("old", json!("x"))).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        store.set(CacheEntry::new("new", json!("y"))).await.unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(store.cleanup().unwrap(), 1);
        assert_eq!(store.keys().unwrap(), vec!["new"]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = LruStore::new(0, Duration::from_secs(1)).err().unwrap();
        assert_eq!(err.kind(), "config");
    }
}
