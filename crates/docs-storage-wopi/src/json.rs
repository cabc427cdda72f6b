//! Lenient field lookup on WOPI JSON bodies.
//!
//! Hosts are inconsistent about types (`"Size": "42"`, `"UserCanWrite": "true"`),
//! so a field of an unexpected type is coerced where obvious and otherwise
//! treated as absent instead of rejecting the whole response.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

/// Parse a body that must be a JSON object.
pub(crate) fn parse_object(body: &str) -> Option<Object> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

pub(crate) fn get_string(object: &Object, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn get_bool(object: &Object, key: &str) -> Option<bool> {
    match object.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub(crate) fn get_u64(object: &Object, key: &str) -> Option<u64> {
    match object.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
