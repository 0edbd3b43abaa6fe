use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CAPACITY: usize = 512;

/// A previously retrieved response body, keyed by request URL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub body: String,
    pub content_type: String,
    pub stored_at: Instant,
}

/// Process-wide URL → body cache. Entries expire `ttl` after being stored and are
/// evicted when read; a full cache drops its oldest entry on insert.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load a cached entry, if present and not expired.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            debug!("Cache hit: {key}");
            return Some(entry.clone());
        }
        debug!("Cache expired: {key}");
        entries.remove(key);
        None
    }

    /// Store a body under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, body: String, content_type: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .values()
                .min_by_key(|e| e.stored_at)
                .map(|e| e.key.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting: {oldest}");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                body,
                content_type,
                stored_at: Instant::now(),
            },
        );
        debug!("Cached: {key}");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
