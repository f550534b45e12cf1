//! Shared TTL cache for breach corpus range responses.
//!
//! Keyed by digest *prefix*, never by secret or owner — a response
//! depends only on public corpus data, so one entry safely serves every
//! owner whose digest shares the prefix.  Read-mostly: lookups take a
//! read lock, inserts and eviction take the write lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// One cached range response.
struct CacheEntry {
    body: String,
    fetched_at: Instant,
}

/// Prefix → response cache with a fixed TTL.
pub struct PrefixCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PrefixCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached body for `prefix` if it is still fresh.
    pub fn get(&self, prefix: &str) -> Option<String> {
        let entries = self.entries.read();
        let entry = entries.get(prefix)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    /// Store a fresh response, evicting any expired entries on the way.
    pub fn insert(&self, prefix: &str, body: String) {
        let mut entries = self.entries.write();
        let ttl = self.ttl;
        entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        entries.insert(
            prefix.to_string(),
            CacheEntry {
                body,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held (fresh or not yet evicted).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
