//! Command-line interface module.

mod args;
pub mod index;
pub mod render;
pub mod serve;

pub use args::{Cli, Commands};

use crate::builtin;
use crate::cache::PageCacheManager;
use crate::config::SurgeConfig;
use crate::core::Engine;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Build the shared engine over the built-in component registry.
pub fn build_engine(config: Arc<SurgeConfig>) -> Result<Arc<Engine>> {
    let page_cache = PageCacheManager::from_config(&config.cache);
    let mut engine =
        Engine::new(config, builtin::registry()?).context("failed to initialise engine")?;
    if let Some(cache) = page_cache {
        engine = engine.with_page_cache(cache);
    }
    Ok(Arc::new(engine))
}
