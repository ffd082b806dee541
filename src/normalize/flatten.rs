//! Flattening of nested records
//!
//! `{"a": {"b": 1}, "c": [1, 2]}` with separator `_` becomes
//! `{"a_b": 1, "c": [1, 2]}`. Arrays are leaves, and so is an empty object,
//! which keeps `unflatten_record` an exact inverse for keys that do not
//! themselves contain the separator.

use crate::types::{JsonObject, JsonValue};

/// Column used when a top-level record is not an object
pub const VALUE_COLUMN: &str = "value";

/// Flatten one record into a single-level row
pub fn flatten_record(value: &JsonValue, separator: &str) -> JsonObject {
    let mut row = JsonObject::new();
    match value {
        JsonValue::Object(map) => flatten_into(map, None, separator, &mut row),
        other => {
            row.insert(VALUE_COLUMN.to_string(), other.clone());
        }
    }
    row
}

fn flatten_into(map: &JsonObject, prefix: Option<&str>, separator: &str, row: &mut JsonObject) {
    for (key, value) in map {
        let column = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(inner) if !inner.is_empty() => {
                flatten_into(inner, Some(&column), separator, row);
            }
            leaf => {
                row.insert(column, leaf.clone());
            }
        }
    }
}

/// Rebuild the nesting of a flattened row by splitting keys on `separator`
pub fn unflatten_record(row: &JsonObject, separator: &str) -> JsonValue {
    let mut root = JsonObject::new();
    for (key, value) in row {
        let parts: Vec<&str> = key.split(separator).collect();
        insert_path(&mut root, &parts, value.clone());
    }
    JsonValue::Object(root)
}

fn insert_path(node: &mut JsonObject, parts: &[&str], value: JsonValue) {
    match parts {
        [] => {}
        [last] => {
            node.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = node
                .entry((*head).to_string())
                .or_insert_with(|| JsonValue::Object(JsonObject::new()));
            if !child.is_object() {
                *child = JsonValue::Object(JsonObject::new());
            }
            if let JsonValue::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

/// Every leaf key path of a nested value, in document order
pub fn key_paths(value: &JsonValue) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    if let JsonValue::Object(map) = value {
        collect_paths(map, &mut Vec::new(), &mut paths);
    }
    paths
}

fn collect_paths(map: &JsonObject, current: &mut Vec<String>, paths: &mut Vec<Vec<String>>) {
    for (key, value) in map {
        current.push(key.clone());
        match value {
            JsonValue::Object(inner) if !inner.is_empty() => collect_paths(inner, current, paths),
            _ => paths.push(current.clone()),
        }
        current.pop();
    }
}
