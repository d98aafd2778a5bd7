//! `[state]` section configuration.
//!
//! ```toml
//! [state]
//! encryption_key = "at-least-32-characters-of-secret-material"
//! ```
//!
//! Without a key, protected state cannot be exposed to the client.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::state::MIN_KEY_LEN;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub encryption_key: Option<String>,
}

impl StateConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(key) = &self.encryption_key
            && key.chars().count() < MIN_KEY_LEN
        {
            diag.error_with_hint(
                "state.encryption_key",
                format!("must be at least {MIN_KEY_LEN} characters"),
                "generate one with `openssl rand -hex 32`",
            );
        }
    }
}
