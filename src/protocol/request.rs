//! Action request decoding.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::DispatchError;

/// Body of `POST /_surge/action`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Identity of the acting component.
    pub id: Option<String>,
    pub slot: Option<String>,
    /// Property overrides applied before the action runs.
    pub states: Option<Map<String, Value>>,
    /// Method name, optionally with inline literal arguments.
    pub action: Option<String>,
    /// Extra trailing argument. `Some(Null)` when sent as `null`.
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
    /// Fragment group (`cart`) or exact fragment key (`cart@total`).
    pub update: Option<String>,
    #[serde(default)]
    pub request_states: Value,
    pub emit: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default, rename = "_local_storage")]
    pub local_storage: Map<String, Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ActionRequest {
    /// Decode a raw body, enforcing the size ceiling before parsing.
    pub fn decode(body: &[u8], limit: usize) -> Result<Self, DispatchError> {
        if body.len() > limit {
            return Err(DispatchError::PayloadTooLarge {
                size: body.len(),
                limit,
            });
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| DispatchError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(DispatchError::InvalidJson("request body must be a JSON object".into()));
        }
        serde_json::from_value(value).map_err(|e| DispatchError::InvalidJson(e.to_string()))
    }

    /// Emit-only requests carry an event and no action.
    pub fn is_emit_only(&self) -> bool {
        self.emit.as_deref().is_some_and(|e| !e.is_empty()) && self.action.is_none()
    }

    pub fn wants_states(&self) -> bool {
        match &self.request_states {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    pub fn update(&self) -> Option<&str> {
        self.update.as_deref().filter(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_request() {
        let body = json!({
            "id": "counter-component_1",
            "action": "add(2)",
            "states": {"count": 3},
            "update": "count",
            "requestStates": true,
            "_local_storage": {"prefs": "{\"dark\":true}"}
        });
        let request = ActionRequest::decode(body.to_string().as_bytes(), 1024).unwrap();
        assert_eq!(request.id.as_deref(), Some("counter-component_1"));
        assert_eq!(request.action.as_deref(), Some("add(2)"));
        assert_eq!(request.states.as_ref().unwrap()["count"], json!(3));
        assert!(request.wants_states());
        assert!(request.value.is_none());
        assert!(request.local_storage.contains_key("prefs"));
    }

    #[test]
    fn test_null_value_is_present() {
        let request = ActionRequest::decode(br#"{"id":"x_1","value":null}"#, 1024).unwrap();
        assert_eq!(request.value, Some(Value::Null));
    }

    #[test]
    fn test_size_limit_checked_first() {
        let err = ActionRequest::decode(b"not json at all", 4).unwrap_err();
        assert!(matches!(err, DispatchError::PayloadTooLarge { size: 15, limit: 4 }));
    }

    #[test]
    fn test_rejects_malformed_and_non_objects() {
        assert!(matches!(
            ActionRequest::decode(b"{", 1024),
            Err(DispatchError::InvalidJson(_))
        ));
        assert!(matches!(
            ActionRequest::decode(b"[1]", 1024),
            Err(DispatchError::InvalidJson(_))
        ));
        assert!(matches!(
            ActionRequest::decode(br#"{"components": "nope"}"#, 1024),
            Err(DispatchError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_emit_only() {
        let body = br#"{"emit":"saved","components":["a_1"]}"#;
        let request = ActionRequest::decode(body, 1024).unwrap();
        assert!(request.is_emit_only());
        let request = ActionRequest::decode(br#"{"emit":"saved","action":"go"}"#, 1024).unwrap();
        assert!(!request.is_emit_only());
    }
}
