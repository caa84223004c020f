//! TTL + LRU cache of resolved reference content.
//!
//! Entries are keyed by the full literal reference string. Recency order is
//! kept by an [`IndexMap`]: the front is least recently used, the back most
//! recently used. Expired entries are dropped lazily when looked up.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;

use weave_core::config::CacheConfig;
use weave_core::CacheStats;

#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    created_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: IndexMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Thread-safe, capacity- and time-bounded store of resolved content.
#[derive(Debug)]
pub struct ReferenceCache {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl ReferenceCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_size)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up `key`. A hit moves the entry to the most-recently-used slot.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    /// Insert or overwrite `key`, evicting the least-recently-used entry first
    /// when the cache is full.
    pub fn set(&self, key: impl Into<String>, content: impl Into<String>) {
        self.set_at(key.into(), content.into(), Instant::now());
    }

    /// Drop a single entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().entries.shift_remove(key).is_some()
    }

    /// Drop every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Zero the hit/miss counters.
    pub fn reset_stats(&self) {
        let mut inner = self.inner.lock();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats::new(inner.hits, inner.misses, inner.entries.len())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if `key` is stored, regardless of expiry. Does not touch
    /// counters or recency.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut inner = self.inner.lock();
        let Some(index) = inner.entries.get_index_of(key) else {
            inner.misses += 1;
            return None;
        };

        let expired = inner
            .entries
            .get_index(index)
            .map(|(_, entry)| now.saturating_duration_since(entry.created_at) >= self.ttl)
            .unwrap_or(true);
        if expired {
            inner.entries.shift_remove_index(index);
            inner.misses += 1;
            tracing::debug!(key, "cache entry expired");
            return None;
        }

        let last = inner.entries.len() - 1;
        inner.entries.move_index(index, last);
        inner.hits += 1;
        inner
            .entries
            .get_index(last)
            .map(|(_, entry)| entry.content.clone())
    }

    pub(crate) fn set_at(&self, key: String, content: String, now: Instant) {
        if self.max_size == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        // Overwrites re-insert at the back so the key becomes most recent.
        if inner.entries.shift_remove(&key).is_none() && inner.entries.len() >= self.max_size {
            if let Some((evicted, _)) = inner.entries.shift_remove_index(0) {
                tracing::debug!(key = %evicted, "cache entry evicted");
            }
        }
        inner.entries.insert(
            key,
            CacheEntry {
                content,
                created_at: now,
            },
        );
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
