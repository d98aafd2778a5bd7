//! Full-page cache.
//!
//! # Module Structure
//!
//! ```text
//! cache/
//! ├── memory     # MemoryCache (dashmap, in-process)
//! ├── file       # FileCache (one file per key, mtime ttl)
//! └── mod.rs     # PageCache trait, PageRequest, PageCacheManager (this file)
//! ```
//!
//! Keys hash the normalized path, the sorted query and the locale, so
//! `/a?x=1&y=2` and `/a/?y=2&x=1` share an entry.

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use percent_encoding::percent_decode_str;
use smallvec::SmallVec;
use url::Url;

use crate::component::PageMeta;
use crate::config::{CacheConfig, CacheStore};
use crate::utils::hash;
use crate::{debug, log};

/// Query parameters that mark a request as interactive.
const UNCACHEABLE_PARAMS: &[&str] = &["action", "update"];

/// Storage backend for rendered pages.
pub trait PageCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, html: &str);
}

// ============================================================================
// PageRequest
// ============================================================================

/// The parts of an HTTP request the page layer looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: String,
    /// Decoded path without trailing slash (`/` for the root).
    pub path: String,
    /// Decoded query pairs in request order.
    pub query: SmallVec<[(String, String); 4]>,
}

impl PageRequest {
    /// Parse a request target such as `/blog/?page=2`.
    pub fn parse(method: &str, target: &str) -> Self {
        let base = Url::parse("http://localhost/").ok();
        let parsed = base.as_ref().and_then(|b| b.join(target).ok());

        let (raw_path, query) = match &parsed {
            Some(url) => (
                url.path().to_owned(),
                url.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            None => (
                target.split('?').next().unwrap_or("/").to_owned(),
                SmallVec::new(),
            ),
        };

        let decoded = percent_decode_str(&raw_path).decode_utf8_lossy();
        let trimmed = decoded.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() };

        Self {
            method: method.to_ascii_uppercase(),
            path,
            query,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::parse("GET", target)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// PageCacheManager
// ============================================================================

pub struct PageCacheManager {
    store: Box<dyn PageCache>,
    locale: String,
}

impl PageCacheManager {
    pub fn new(store: Box<dyn PageCache>, locale: impl Into<String>) -> Self {
        Self {
            store,
            locale: locale.into(),
        }
    }

    /// Manager per `[cache]`, `None` when disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let store: Box<dyn PageCache> = match config.store {
            CacheStore::File => Box::new(FileCache::new(&config.dir, config.ttl())),
            CacheStore::Memory => Box::new(MemoryCache::new(config.ttl())),
        };
        Some(Self::new(store, &config.locale))
    }

    /// Cache key for `request`.
    pub fn key(&self, request: &PageRequest) -> String {
        let mut query: Vec<_> = request
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        query.sort_unstable();
        hash::hex(&format!("{}|{}|{}", request.path, query.join("&"), self.locale))
    }

    pub fn is_cacheable(request: &PageRequest, meta: &PageMeta) -> bool {
        request.method == "GET"
            && meta.cache
            && !request
                .query
                .iter()
                .any(|(k, _)| UNCACHEABLE_PARAMS.contains(&k.as_str()))
    }

    pub fn get(&self, request: &PageRequest, meta: &PageMeta) -> Option<String> {
        if !Self::is_cacheable(request, meta) {
            debug!("cache"; "skip {} {}", request.method, request.path);
            return None;
        }
        let hit = self.store.get(&self.key(request));
        match &hit {
            Some(_) => debug!("cache"; "hit {}", request.path),
            None => debug!("cache"; "miss {}", request.path),
        }
        hit
    }

    pub fn put(&self, request: &PageRequest, html: &str, meta: &PageMeta) {
        if !Self::is_cacheable(request, meta) {
            return;
        }
        self.store.put(&self.key(request), html);
        log!("cache"; "stored {}", request.path);
    }
}
