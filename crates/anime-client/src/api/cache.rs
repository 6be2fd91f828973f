//! In-memory response cache.
//!
//! Stores parsed upstream responses keyed by request URL. An entry older than
//! the freshness window is treated as absent but stays in the map until the
//! next successful fetch of the same URL overwrites it.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry {
    payload: Arc<Value>,
    fetched_at: Instant,
}

/// Cache of parsed API responses
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Age after which an entry is no longer served
    freshness: Duration,
    /// Whether caching is enabled
    enabled: bool,
}

impl ResponseCache {
    /// Create a new cache
    pub fn new(freshness: Duration, enabled: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            freshness,
            enabled,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a fresh cached payload if one exists
    pub fn get(&self, url: &str) -> Option<Arc<Value>> {
        if !self.enabled {
            return None;
        }

        let entries = self.entries();
        match entries.get(url) {
            Some(entry) if entry.fetched_at.elapsed() < self.freshness => {
                debug!(url = %url, "Cache hit");
                Some(Arc::clone(&entry.payload))
            }
            Some(entry) => {
                debug!(
                    url = %url,
                    age_ms = entry.fetched_at.elapsed().as_millis(),
                    "Cache entry stale"
                );
                None
            }
            None => {
                debug!(url = %url, "Cache miss");
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry for the URL
    pub fn insert(&self, url: &str, payload: Arc<Value>) {
        if !self.enabled {
            return;
        }

        self.entries().insert(
            url.to_string(),
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
        debug!(url = %url, "Cache stored");
    }

    /// When the entry for a URL was captured, fresh or not
    pub fn fetched_at(&self, url: &str) -> Option<Instant> {
        self.entries().get(url).map(|entry| entry.fetched_at)
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        debug!(removed = removed, "Cache cleared");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        let fresh_entries = entries
            .values()
            .filter(|entry| entry.fetched_at.elapsed() < self.freshness)
            .count();

        CacheStats {
            total_entries: entries.len(),
            fresh_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
}
