//! Typed extraction helpers over a parsed `serde_json::Value` object.
//!
//! These centralize the "is this key present, and does it have the right
//! JSON kind" checks that headers and claims sets both need, so header
//! parsing and claims parsing fail the same way for the same shape of
//! mistake.

use serde_json::{Map, Value};

use crate::error::{Error, JoseResult};

/// Extract a required string field.
pub fn get_str<'a>(obj: &'a Map<String, Value>, name: &str) -> JoseResult<Option<&'a str>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(Error::malformed(format!("'{name}' must be a string"))),
    }
}

/// Extract a number, truncated toward floor to an `i64` (accepts integer or
/// floating-point JSON numbers, per the claims-set date conversion rule).
pub fn get_long(obj: &Map<String, Value>, name: &str) -> JoseResult<Option<i64>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Some(f.floor() as i64))
            } else {
                Err(Error::malformed(format!("'{name}' is not a valid number")))
            }
        }
        Some(_) => Err(Error::malformed(format!("'{name}' must be numeric"))),
    }
}

/// Extract a string array (rejects mixed-type arrays).
pub fn get_str_array(obj: &Map<String, Value>, name: &str) -> JoseResult<Option<Vec<String>>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => return Err(Error::malformed(format!("'{name}' must be an array of strings"))),
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(Error::malformed(format!("'{name}' must be an array"))),
    }
}

/// Extract a field that may be either a single string or an array of
/// strings, normalizing to an ordered sequence (used for `aud`).
pub fn get_str_or_str_array(obj: &Map<String, Value>, name: &str) -> JoseResult<Option<Vec<String>>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(Value::Array(_)) => get_str_array(obj, name),
        Some(_) => Err(Error::malformed(format!(
            "'{name}' must be a string or array of strings"
        ))),
    }
}

/// Extract a nested JSON object field.
pub fn get_object<'a>(obj: &'a Map<String, Value>, name: &str) -> JoseResult<Option<&'a Map<String, Value>>> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(m)) => Ok(Some(m)),
        Some(_) => Err(Error::malformed(format!("'{name}' must be an object"))),
    }
}

/// Parse a byte sequence as a top-level JSON object.
pub fn parse_object(bytes: &[u8]) -> JoseResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(m) => Ok(m),
        _ => Err(Error::malformed("expected a JSON object")),
    }
}
