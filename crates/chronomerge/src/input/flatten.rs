//! Flattening of nested JSON objects into dotted column names.

use serde_json::{Map, Value};

use super::source::FlatRecord;

/// Flatten a JSON object so nested objects become `parent.child` keys.
///
/// Arrays and primitives are leaves and are copied as-is.
pub fn flatten_object(object: &Map<String, Value>) -> FlatRecord {
    let mut out = FlatRecord::new();
    flatten_into(&mut out, "", object);
    out
}

/// Flatten any JSON value into a record.
///
/// Non-object values have no columns and flatten to `None`.
pub fn flatten_value(value: &Value) -> Option<FlatRecord> {
    value.as_object().map(flatten_object)
}

/// Flatten an already-parsed record again, expanding any object-valued cells.
pub fn flatten_record(record: &FlatRecord) -> FlatRecord {
    let mut out = FlatRecord::new();
    for (key, value) in record {
        match value {
            Value::Object(child) => flatten_into(&mut out, key, child),
            other => {
                out.insert(key.clone(), other.clone());
            }
        }
    }
    out
}

fn flatten_into(out: &mut FlatRecord, prefix: &str, object: &Map<String, Value>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(child) => flatten_into(out, &name, child),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}
