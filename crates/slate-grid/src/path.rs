//! Dotted-path addressing over JSON trees, plus the wire-safe key codec.
//!
//! Every `.`-separated segment walks one level down. Arrays are indexed by
//! numeric segments on read; writes only ever create objects.

use serde_json::{Map, Value};

/// Stands in for `.` in keys that travel through flat encodings.
pub const WIRE_SEPARATOR: &str = "__";

/// Replaces every `_` in a segment that would otherwise blur the separator.
const ESCAPED_UNDERSCORE: &str = "_5F";

/// Joins segments with [`WIRE_SEPARATOR`]. A segment is escaped when it holds
/// `__` or [`ESCAPED_UNDERSCORE`], or when an underscore touches a separator,
/// so keys such as `created_at` and `a.b` keep their plain form.
pub fn encode_key(key: &str) -> String {
    let segments: Vec<&str> = key.split('.').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let ambiguous = segment.contains(WIRE_SEPARATOR)
                || segment.contains(ESCAPED_UNDERSCORE)
                || (i > 0 && segment.starts_with('_'))
                || (i < last && segment.ends_with('_'));
            if ambiguous {
                segment.replace('_', ESCAPED_UNDERSCORE)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(WIRE_SEPARATOR)
}

pub fn decode_key(key: &str) -> String {
    key.split(WIRE_SEPARATOR)
        .map(|segment| segment.replace(ESCAPED_UNDERSCORE, "_"))
        .collect::<Vec<_>>()
        .join(".")
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Writes `value` at `path`, replacing any scalar that sits where an
/// intermediate object is needed.
pub fn set(root: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };

    let mut node = root;
    if let Some(parent) = parent {
        for segment in parent.split('.') {
            node = object_mut(node)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
    object_mut(node).insert(leaf.to_string(), value);
}

/// First segment of a dotted path, or `None` when the path is not nested.
pub fn top_segment(path: &str) -> Option<&str> {
    path.split_once('.').map(|(top, _)| top)
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
