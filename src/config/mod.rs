//! Engine configuration management for `surge.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── cache      # [cache]
//! │   ├── engine     # [engine]
//! │   ├── serve      # [serve]
//! │   └── state      # [state]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── handle     # Global config handle
//! └── mod.rs         # SurgeConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `[engine]` | Environment, component namespaces, index, payload    |
//! | `[state]`  | Encryption key for protected state tokens            |
//! | `[cache]`  | Full-page cache (store, ttl, locale)                 |
//! | `[serve]`  | Development server (interface, port)                 |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    CacheConfig, CacheStore, DEFAULT_MAX_PAYLOAD, EngineConfig, Env, ServeConfig, StateConfig,
};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, cfg, init_config};

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "surge.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing surge.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurgeConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl SurgeConfig {
    /// Load configuration, searching upward from cwd for `config_name`.
    ///
    /// A missing file yields the defaults rooted at cwd.
    pub fn load(config_name: &Path) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", config_name.display());
                Self::default()
            }
        };

        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no unknown-field detection).
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            log!("warning"; "- {}", field);
        }
    }

    /// Resolve the root and make relative paths absolute against it.
    fn finalize(&mut self) {
        self.root = self
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();

        if self.engine.index_file().is_some_and(|p| p.is_relative()) {
            self.engine.index_path = self.root.join(&self.engine.index_path);
        }
        if self.cache.dir.is_relative() {
            self.cache.dir = self.root.join(&self.cache.dir);
        }
    }

    /// Validate every section, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.engine.validate(&mut diag);
        self.state.validate(&mut diag);
        self.cache.validate(&mut diag);

        if self.state.encryption_key.is_none() && !self.engine.env.is_dev() {
            diag.warn(
                "state.encryption_key",
                "not set, components with protected state cannot render",
            );
        }
        for warning in diag.warnings() {
            log!("warning"; "{} {}", warning.field, warning.message);
        }

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

/// Parse a config snippet for tests, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> SurgeConfig {
    let (parsed, ignored) = SurgeConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SurgeConfig::from_str("[engine\nenv = \"dev\"").is_err());
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let toml = "[engine]\nbogus = 1\n[nope]\nx = 2";
        let (_, ignored) = SurgeConfig::parse_with_ignored(toml).unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.iter().any(|f| f.contains("bogus")));
    }

    #[test]
    fn test_validate_reports_every_section() {
        let config = test_parse_config(concat!(
            "[engine]\nmax_payload = 0\n",
            "[state]\nencryption_key = \"short\"\n",
            "[cache]\nenabled = true\nttl = 0",
        ));
        match config.validate() {
            Err(ConfigError::Diagnostics(diag)) => assert_eq!(diag.len(), 3),
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[engine]\nindex_path = \"cache/index.json\"\n").unwrap();

        let config = SurgeConfig::load(&path).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(
            config.engine.index_path,
            dir.path().join("cache/index.json")
        );
        assert_eq!(config.cache.dir, dir.path().join(".surge/pages"));
    }
}
