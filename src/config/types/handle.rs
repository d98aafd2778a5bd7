//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads. The engine receives its config
//! explicitly; this handle serves the CLI layer.

use crate::config::SurgeConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<SurgeConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(SurgeConfig::default()));

#[inline]
pub fn cfg() -> Arc<SurgeConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: SurgeConfig) -> Arc<SurgeConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
