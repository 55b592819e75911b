// src/fieldpath.rs

use serde_json::{Map, Value};

/// Resolve a dot-delimited path against a JSON record.
///
/// Missing or non-object intermediates yield "", as do null/absent leaves.
/// Scalar leaves are coerced to their string form. Never panics.
pub fn get(record: &Value, path: &str) -> String {
    let mut current = record;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    match current {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Paths are expected to address leaves; an object/array here means
        // the caller asked for an interior node.
        Value::Object(_) | Value::Array(_) => String::new(),
    }
}

/// Write `value` at `path`, returning a new record. The original is left
/// untouched; missing intermediates are created as empty objects, and a
/// non-object intermediate is replaced by one so the write always lands.
pub fn set(record: &Value, path: &str, value: &str) -> Value {
    set_segments(record, &path.split('.').collect::<Vec<_>>(), value)
}

fn set_segments(node: &Value, segments: &[&str], value: &str) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return Value::String(value.to_string());
    };
    let mut map = match node {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };
    let child = map.get(*head).cloned().unwrap_or(Value::Null);
    map.insert(head.to_string(), set_segments(&child, rest, value));
    Value::Object(map)
}
