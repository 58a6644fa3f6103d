//! Query-response cache with TTL eviction.
//!
//! Keyed by `Query::cache_key()`. The engine additionally clears this cache
//! on every upsert, so entries never describe a corpus the store no longer
//! holds; the TTL bounds staleness for store backends that mutate out of
//! band.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::Response;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL cache of full responses
pub struct ResponseCache {
    entries: Mutex<HashMap<u64, (Response, Instant)>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch a live entry; expired entries are removed on access
    pub fn get(&self, key: u64) -> Option<Response> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(&key) {
            Some((_, inserted)) if inserted.elapsed() >= self.ttl => {
                entries.remove(&key);
                None
            }
            Some((response, _)) => Some(response.clone()),
            None => None,
        }
    }

    pub fn insert(&self, key: u64, response: Response) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (response, Instant::now()));
        }
    }

    /// Drop every entry; called on upsert
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
