//! Action response and diagnostic bodies.

use serde::Serialize;
use serde_json::{Map, Value};

/// One re-rendered component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub result: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct ActionResponse {
    /// Full markup, when the client asked for states alongside it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Content of an exactly addressed fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// `group@key` -> markup for a fragment group update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragments: Option<Map<String, Value>>,
    pub updates: Vec<Update>,
    /// Exposed state of the acting component, as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<String>,
    #[serde(rename = "localStorage", skip_serializing_if = "Option::is_none")]
    pub local_storage: Option<Map<String, Value>>,
}

impl ActionResponse {
    pub fn has_update_for(&self, identity: &str) -> bool {
        self.updates.iter().any(|u| u.component == identity)
    }
}

/// Error body sent in place of a response.
#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub error: bool,
    pub message: String,
}

impl Diagnostic {
    /// Full detail in development, a generic message otherwise.
    pub fn new(message: impl Into<String>, detailed: bool) -> Self {
        Self {
            error: true,
            message: if detailed { message.into() } else { "Internal error".to_owned() },
        }
    }
}
