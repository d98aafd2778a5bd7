//! `[engine]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [engine]
//! env = "dev"                                   # dev | prod
//! namespaces = ["app::components", "app::pages"] # empty = every registered namespace
//! index_path = ".surge/component_index.json"    # "" = in-memory index only
//! max_payload = 1048576                         # action request ceiling, bytes
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Action request body ceiling (1 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Deployment environment; controls diagnostic detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Dev,
    #[default]
    Prod,
}

impl Env {
    #[inline]
    pub fn is_dev(self) -> bool {
        self == Self::Dev
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub env: Env,

    /// Type-path prefixes scanned for components.
    pub namespaces: Vec<String>,

    /// Persisted component index location.
    pub index_path: PathBuf,

    /// Maximum action request body size in bytes.
    pub max_payload: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            env: Env::Prod,
            namespaces: Vec::new(),
            index_path: PathBuf::from(".surge/component_index.json"),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl EngineConfig {
    /// Index location, `None` when persistence is disabled.
    pub fn index_file(&self) -> Option<&PathBuf> {
        (!self.index_path.as_os_str().is_empty()).then_some(&self.index_path)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_payload == 0 {
            diag.error("engine.max_payload", "must be greater than 0");
        }
        for ns in &self.namespaces {
            if ns.trim().is_empty() || ns.ends_with("::") {
                diag.error_with_hint(
                    "engine.namespaces",
                    format!("invalid namespace `{ns}`"),
                    "use a type path prefix such as `app::components`",
                );
            }
        }
    }
}
