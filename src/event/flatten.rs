//! Flattening of wide events into string key/value pairs.
//!
//! Log sinks only accept flat fields. Scalars become their string form,
//! nested objects are expanded into `<prefix>_<key>` entries and absent
//! values are dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Nested facets emitted under a shorter prefix than their field name.
const PREFIX_ALIASES: &[(&str, &str)] = &[("feature_flags", "ff")];

/// Flat field set handed to a sink.
pub type FlatFields = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("event serialized to {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Flatten any serializable record whose JSON form is an object.
pub fn flatten<T: Serialize>(record: &T) -> Result<FlatFields, FlattenError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => {
            let mut out = FlatFields::new();
            for (key, value) in map {
                let prefix = alias_for(&key);
                insert_flat(&mut out, prefix, value);
            }
            Ok(out)
        }
        other => Err(FlattenError::NotAnObject(kind_of(&other))),
    }
}

fn alias_for(key: &str) -> &str {
    PREFIX_ALIASES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, alias)| *alias)
        .unwrap_or(key)
}

fn insert_flat(out: &mut FlatFields, key: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            out.insert(key.to_string(), s);
        }
        Value::Bool(b) => {
            out.insert(key.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(key.to_string(), n.to_string());
        }
        Value::Array(_) => {
            out.insert(key.to_string(), value.to_string());
        }
        Value::Object(map) => {
            for (sub, v) in map {
                insert_flat(out, &format!("{key}_{sub}"), v);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
