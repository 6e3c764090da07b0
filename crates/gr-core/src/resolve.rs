//! Schema-tolerant field access for review records.
//!
//! The same logical field shows up under different casings and spellings
//! depending on which tool produced the dump (`patchSets` from the ssh query,
//! `patch_sets` from hand-written exports, `_number` from the REST API). Every
//! read of an externally sourced record goes through this module.

use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Key that marks a query statistics row rather than a change.
pub const STATS_MARKER: &str = "rowCount";

/// Looks up `key`: exact match first, then the first case-insensitive match
/// in the object's key order.
pub fn resolve<'a>(object: &'a Object, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key) {
        return Some(value);
    }
    object
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

/// First non-null hit across a list of aliases.
pub fn resolve_any<'a>(object: &'a Object, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| resolve(object, key))
        .find(|value| !value.is_null())
}

pub fn resolve_str<'a>(object: &'a Object, keys: &[&str]) -> Option<&'a str> {
    resolve_any(object, keys).and_then(Value::as_str)
}

/// Scalar field rendered as text; numbers and booleans keep their JSON form.
pub fn resolve_text(object: &Object, keys: &[&str]) -> Option<String> {
    match resolve_any(object, keys)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Positive integer field; accepts JSON numbers and numeric strings.
pub fn resolve_u32(object: &Object, keys: &[&str]) -> Option<u32> {
    resolve_any(object, keys).and_then(as_u32)
}

/// A person's display name: either `{"name": ...}` or a bare string.
pub fn resolve_name(object: &Object, keys: &[&str]) -> Option<String> {
    match resolve_any(object, keys)? {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Object(person) => resolve_text(person, &["name", "username", "email"]),
        _ => None,
    }
}

pub fn resolve_list<'a>(object: &'a Object, keys: &[&str]) -> Option<&'a Vec<Value>> {
    resolve_any(object, keys).and_then(Value::as_array)
}

pub fn is_stats_row(object: &Object) -> bool {
    resolve(object, STATS_MARKER).is_some()
}

pub fn as_u32(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    number.filter(|n| *n > 0)
}
