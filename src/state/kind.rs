//! Declared state kinds and read-time coercion.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::utils::json::parse_structured;

/// Structured type declaration for a state cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Bool,
    Int,
    Float,
    String,
    List,
    #[default]
    Any,
}

impl StateKind {
    /// Whether this kind accepts a list (hydration decodes strings for it).
    #[inline]
    pub const fn accepts_list(self) -> bool {
        matches!(self, Self::List)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Any => "any",
        }
    }

    /// Coerce a stored value to this kind.
    pub fn coerce(self, value: &Value) -> Value {
        match self {
            Self::Any => value.clone(),
            Self::Bool => Value::Bool(truthy(value)),
            Self::Int => Value::from(to_i64(value)),
            Self::Float => Number::from_f64(to_f64(value)).map_or(Value::from(0), Value::Number),
            Self::String => Value::String(crate::utils::json::scalar_to_string(value)),
            Self::List => Value::Array(to_list(value)),
        }
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(n.as_f64().unwrap_or(0.0) as i64),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// List coercion: falsy markers become empty, JSON text is decoded, scalars wrap.
fn to_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Null | Value::Bool(false) => Vec::new(),
        Value::Array(items) => items.clone(),
        Value::String(s) if s.is_empty() || s.trim() == "[]" => Vec::new(),
        Value::String(s) => match parse_structured(s) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![value.clone()],
        },
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_coercion_empty_markers() {
        for v in [json!(false), Value::Null, json!(""), json!("[]")] {
            assert_eq!(StateKind::List.coerce(&v), json!([]));
        }
    }

    #[test]
    fn test_list_coercion_decodes_json_text() {
        assert_eq!(
            StateKind::List.coerce(&json!(r#"["a","b"]"#)),
            json!(["a", "b"])
        );
        assert_eq!(
            StateKind::List.coerce(&json!(r#"{"k":1}"#)),
            json!([{"k": 1}])
        );
    }

    #[test]
    fn test_list_coercion_wraps_scalar() {
        assert_eq!(StateKind::List.coerce(&json!("solo")), json!(["solo"]));
        assert_eq!(StateKind::List.coerce(&json!(7)), json!([7]));
    }

    #[test]
    fn test_scalar_coercions() {
        assert_eq!(StateKind::Int.coerce(&json!("41")), json!(41));
        assert_eq!(StateKind::Int.coerce(&json!("4.9")), json!(4));
        assert_eq!(StateKind::Float.coerce(&json!("2.5")), json!(2.5));
        assert_eq!(StateKind::Bool.coerce(&json!("0")), json!(false));
        assert_eq!(StateKind::Bool.coerce(&json!("yes")), json!(true));
        assert_eq!(StateKind::String.coerce(&json!(12)), json!("12"));
        assert_eq!(StateKind::Any.coerce(&json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let kind: StateKind = serde_json::from_str("\"list\"").unwrap();
        assert_eq!(kind, StateKind::List);
        assert!(kind.accepts_list());
    }
}
