//! JSON sniffing helpers.

use serde_json::Value;

/// Check whether `text` is a JSON object or array.
///
/// Scalars are rejected on purpose: a rendered `"42"` is markup, not an envelope.
pub fn looks_like_json(text: &str) -> bool {
    parse_structured(text).is_some()
}

/// Parse `text` if it is a JSON object or array.
pub fn parse_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Render a scalar JSON value as plain text (strings without quotes).
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1".into() } else { String::new() },
        other => other.to_string(),
    }
}
