//! Configuration section definitions.

pub mod cache;
pub mod engine;
pub mod serve;
pub mod state;

pub use cache::{CacheConfig, CacheStore};
pub use engine::{DEFAULT_MAX_PAYLOAD, EngineConfig, Env};
pub use serve::ServeConfig;
pub use state::StateConfig;
