//! In-process page store.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::PageCache;

pub struct MemoryCache {
    entries: DashMap<String, (Instant, String)>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PageCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        {
            let entry = self.entries.get(key)?;
            let (stored, html) = entry.value();
            if stored.elapsed() <= self.ttl {
                return Some(html.clone());
            }
        }
        // Shard guard must be released before removing
        self.entries.remove(key);
        None
    }

    fn put(&self, key: &str, html: &str) {
        self.entries.insert(key.to_owned(), (Instant::now(), html.to_owned()));
    }
}
