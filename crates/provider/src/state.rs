//! Flat configuration state helpers
//!
//! Resource configuration and written-back state travel as flat attribute
//! maps (`serde_json::Value` objects). These helpers do the repetitive
//! getting and building so the per-resource expand/flatten code stays
//! declarative.

use serde_json::{json, Value};

use crate::error::{Error, Result};

/// String attribute, empty when missing or not a string.
pub fn get_string_attr(config: &Value, key: &str) -> String {
    config
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// String attribute that must be present and non-empty.
pub fn require_string_attr(config: &Value, key: &'static str) -> Result<String> {
    match config.get(key) {
        None | Some(Value::Null) => Err(Error::MissingAttribute(key)),
        Some(Value::String(s)) if s.is_empty() => Err(Error::MissingAttribute(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::WrongAttributeType {
            key,
            expected: "a string",
        }),
    }
}

pub fn get_int_attr(config: &Value, key: &str, default: i64) -> i64 {
    config.get(key).and_then(Value::as_i64).unwrap_or(default)
}

pub fn require_int_attr(config: &Value, key: &'static str) -> Result<i64> {
    match config.get(key) {
        None | Some(Value::Null) => Err(Error::MissingAttribute(key)),
        Some(v) => v.as_i64().ok_or(Error::WrongAttributeType {
            key,
            expected: "an integer",
        }),
    }
}

pub fn get_bool_attr(config: &Value, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Nested block list attribute, empty when missing.
pub fn get_block_list<'a>(config: &'a Value, key: &str) -> Vec<&'a Value> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Build a flat attribute map.
pub fn make_state(attrs: Vec<(&str, Value)>) -> Value {
    let mut map = serde_json::Map::new();
    for (key, value) in attrs {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

pub fn string_value(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

pub fn int_value(n: i64) -> Value {
    json!(n)
}

pub fn bool_value(b: bool) -> Value {
    Value::Bool(b)
}

pub fn list_value(items: Vec<Value>) -> Value {
    Value::Array(items)
}
