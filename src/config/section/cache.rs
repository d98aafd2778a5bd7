//! `[cache]` section configuration (full-page cache).
//!
//! ```toml
//! [cache]
//! enabled = true
//! store = "file"         # file | memory
//! dir = ".surge/pages"   # file store location
//! ttl = 600              # seconds
//! locale = "en"          # part of the cache key
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Backend holding cached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStore {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub store: CacheStore,
    pub dir: PathBuf,
    pub ttl: u64,
    pub locale: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            store: CacheStore::File,
            dir: PathBuf::from(".surge/pages"),
            ttl: 600,
            locale: "en".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.enabled && self.ttl == 0 {
            diag.error(
                "cache.ttl",
                "must be greater than 0 when the cache is enabled",
            );
        }
    }
}
