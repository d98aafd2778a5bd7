//! A single named, typed, constrained value.

use serde::Serialize;
use serde_json::Value;

use super::{StateError, StateKind};
use crate::utils::json::scalar_to_string;

/// Declaration options for a state cell.
#[derive(Debug, Clone, Default)]
pub struct StateSpec {
    pub(crate) default: Value,
    pub(crate) allowed: Option<Vec<Value>>,
    pub(crate) protected: bool,
    pub(crate) kind: Option<StateKind>,
}

impl StateSpec {
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
            ..Self::default()
        }
    }

    /// Restrict the cell to a closed set of values.
    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Never expose the value in plaintext.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Introspection record for a declared cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMeta {
    pub name: String,
    pub key: String,
    pub kind: StateKind,
    pub protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct StateCell {
    name: String,
    key: String,
    value: Value,
    allowed: Option<Vec<Value>>,
    protected: bool,
    kind: StateKind,
}

impl StateCell {
    pub(crate) fn new(
        name: &str,
        key: String,
        value: Value,
        spec: &StateSpec,
        kind: StateKind,
    ) -> Self {
        Self {
            name: name.to_owned(),
            key,
            value,
            allowed: spec.allowed.clone(),
            protected: spec.protected,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage key, unique across sibling instances.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value as stored, without coercion.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// The value coerced to the declared kind.
    pub fn value(&self) -> Value {
        self.kind.coerce(&self.value)
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn allowed(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }

    /// Validate a candidate value against the allowed set.
    ///
    /// Scalars compare loosely so `"2"` matches an allowed `2`; hydrated
    /// request values arrive as strings.
    pub fn check(&self, candidate: &Value) -> Result<(), StateError> {
        let Some(allowed) = &self.allowed else {
            return Ok(());
        };
        if allowed.iter().any(|a| loosely_equal(a, candidate)) {
            return Ok(());
        }
        Err(StateError::Constraint {
            name: self.name.clone(),
            value: candidate.to_string(),
            allowed: Value::Array(allowed.clone()).to_string(),
        })
    }

    /// Replace the value, returning the previous one if it changed.
    pub(crate) fn assign(&mut self, value: Value) -> Option<Value> {
        if self.value == value {
            return None;
        }
        Some(std::mem::replace(&mut self.value, value))
    }

    pub fn meta(&self) -> StateMeta {
        StateMeta {
            name: self.name.clone(),
            key: self.key.clone(),
            kind: self.kind,
            protected: self.protected,
            allowed: self.allowed.clone(),
        }
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    let scalar = |v: &Value| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_));
    scalar(a) && scalar(b) && scalar_to_string(a) == scalar_to_string(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell(spec: StateSpec) -> StateCell {
        let value = spec.default.clone();
        StateCell::new("size", "c_1__size".into(), value, &spec, StateKind::Any)
    }

    #[test]
    fn test_check_allowed_values() {
        let c = cell(StateSpec::new("sm").allowed(["sm", "md", "lg"]));
        assert!(c.check(&json!("md")).is_ok());

        let err = c.check(&json!("xl")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("size"));
        assert!(msg.contains("\"lg\""));
    }

    #[test]
    fn test_check_is_loose_for_scalars() {
        let c = cell(StateSpec::new(1).allowed([1, 2, 3]));
        assert!(c.check(&json!("2")).is_ok());
        assert!(c.check(&json!("4")).is_err());
    }

    #[test]
    fn test_assign_reports_change_only() {
        let mut c = cell(StateSpec::new(1));
        assert_eq!(c.assign(json!(1)), None);
        assert_eq!(c.assign(json!(2)), Some(json!(1)));
        assert_eq!(c.raw(), &json!(2));
    }
}
