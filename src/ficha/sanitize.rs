//! Decides which sections of a form count as empty.
//!
//! The persistence core stores whatever it is given; import runs payloads
//! through [`strip_empty_sections`] first so untouched wizard steps do not
//! clutter the stored form.

use crate::model::FormData;
use serde_json::Value;

/// True for `null`, blank strings, and arrays/objects holding only empty values.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(map) => map.values().all(is_empty_value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Removes empty sections. Returns the names that were dropped.
pub fn strip_empty_sections(data: &mut FormData) -> Vec<String> {
    let mut dropped = Vec::new();
    data.retain(|name, value| {
        if is_empty_value(value) {
            dropped.push(name.clone());
            false
        } else {
            true
        }
    });
    dropped
}
