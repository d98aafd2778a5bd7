//! Inline call syntax: `name(arg1, "arg 2", 3)`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

static RE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z_]\w*)\((.*)\)$").unwrap());

/// Leading/trailing whitespace, optional sign, decimal or exponent form.
static RE_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").unwrap());

/// Split an action string into a method name and literal arguments.
///
/// Arguments are comma separated; numeric tokens become numbers and the rest
/// lose surrounding quotes. A bare name has no arguments.
pub fn parse_call(raw: &str) -> (String, Vec<Value>) {
    let Some(caps) = RE_CALL.captures(raw) else {
        return (raw.to_owned(), Vec::new());
    };

    let args = caps[2].trim();
    let args = if args.is_empty() {
        Vec::new()
    } else {
        args.split(',').map(|arg| literal(arg.trim())).collect()
    };
    (caps[1].to_owned(), args)
}

fn literal(token: &str) -> Value {
    if RE_NUMERIC.is_match(token) {
        let token = token.trim();
        if let Ok(n) = token.parse::<i64>() {
            return Value::from(n);
        }
        if let Some(n) = token.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(token.trim_matches(|c| c == '"' || c == '\'').to_owned())
}
