//! Bracketed query strings: `filter[status]=active&sort[way]=-1`.
//!
//! Parsed values are always strings; nesting is always objects, so
//! `a[0]=x` yields `{"a": {"0": "x"}}`.

use serde_json::{Map, Value};

use crate::path;

pub fn parse(raw: &str) -> Map<String, Value> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut root = Value::Object(Map::new());
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        path::set(&mut root, &segments.join("."), Value::String(value.into_owned()));
    }
    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Flattens nested objects and arrays into bracketed pairs. Nulls are
/// skipped, scalars use their JSON text without quotes.
pub fn stringify(params: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten(format!("{prefix}[{key}]"), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(format!("{prefix}[{index}]"), child, out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        other => out.push((prefix, other.to_string())),
    }
}

/// `filter[status]` → `["filter", "status"]`. Dots inside a segment are
/// kept as wire separators so the key does not nest further.
fn split_key(key: &str) -> Vec<String> {
    let (head, rest) = match key.find('[') {
        Some(i) => (&key[..i], &key[i..]),
        None => (key, ""),
    };
    let mut segments = Vec::new();
    if !head.is_empty() {
        segments.push(path::encode_key(head));
    }
    for part in rest.split('[').skip(1) {
        let part = part.strip_suffix(']').unwrap_or(part);
        if !part.is_empty() {
            segments.push(path::encode_key(part));
        }
    }
    segments
}
