use serde_json::{Map, Value, json};

use crate::events::{Emitter, Subscription};
use crate::path;
use crate::value::parse_int;

/// Direction used when a sort key is set but no usable direction is.
pub const DEFAULT_WAY: i64 = -1;

/// A JSON object addressed by dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTree {
    root: Value,
}

impl Default for KeyTree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl KeyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-object values are discarded; a tree is always rooted in an object.
    pub fn from_value(root: Value) -> Self {
        match root {
            Value::Object(_) => Self { root },
            _ => Self::default(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path::get(&self.root, path)
    }

    pub fn set(&mut self, path: &str, value: Value) {
        path::set(&mut self.root, path, value);
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        match &self.root {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_map().is_empty()
    }
}

/// Per-grid configuration and request state.
///
/// `declared` holds owner defaults (id, route, limit...), `state` the
/// per-request overrides, `alteration` the viewer's persisted overlay and
/// `include` extra top-level response entries. Every write emits the exact
/// path and, for nested paths, the top-level segment with its new subtree.
#[derive(Debug)]
pub struct StateStore {
    declared: KeyTree,
    state: KeyTree,
    alteration: KeyTree,
    include: Map<String, Value>,
    emitter: Emitter,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_declared(Value::Object(Map::new()))
    }

    pub fn with_declared(declared: Value) -> Self {
        Self {
            declared: KeyTree::from_value(declared),
            state: KeyTree::from_value(json!({ "sort": {}, "filter": {} })),
            alteration: KeyTree::new(),
            include: Map::new(),
            emitter: Emitter::new(),
        }
    }

    // ── Declared ────────────────────────────────────────────────

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.declared.get(path)
    }

    pub fn set(&mut self, path: &str, value: Value) -> &mut Self {
        write(&mut self.declared, &self.emitter, path, value);
        self
    }

    pub fn declared(&self) -> &KeyTree {
        &self.declared
    }

    // ── State ───────────────────────────────────────────────────

    /// Reads request state; with `fallback`, a missing or null entry reads
    /// through to the declared value at the same path.
    pub fn state_get(&self, path: &str, fallback: bool) -> Option<&Value> {
        match self.state.get(path) {
            Some(Value::Null) | None if fallback => self.declared.get(path),
            found => found,
        }
    }

    pub fn state_set(&mut self, path: &str, value: Value) -> &mut Self {
        write(&mut self.state, &self.emitter, path, value);
        self
    }

    pub fn state(&self) -> &KeyTree {
        &self.state
    }

    // ── Alteration ──────────────────────────────────────────────

    pub fn alteration_get(&self, path: &str) -> Option<&Value> {
        self.alteration.get(path)
    }

    pub fn alteration_set(&mut self, path: &str, value: Value) -> &mut Self {
        write(&mut self.alteration, &self.emitter, path, value);
        self
    }

    pub fn replace_alteration(&mut self, alteration: Value) -> &mut Self {
        self.alteration = KeyTree::from_value(alteration);
        self.emitter.emit("alter", self.alteration.as_value());
        self
    }

    pub fn alteration(&self) -> &KeyTree {
        &self.alteration
    }

    // ── Include ─────────────────────────────────────────────────

    pub fn include(&mut self, extra: Map<String, Value>) -> &mut Self {
        self.include.extend(extra);
        self
    }

    pub fn included(&self) -> &Map<String, Value> {
        &self.include
    }

    // ── Notifications ───────────────────────────────────────────

    pub fn on(
        &self,
        path: impl Into<String>,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.emitter.on(path, listener)
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

fn write(tree: &mut KeyTree, emitter: &Emitter, path: &str, value: Value) {
    tree.set(path, value);
    if let Some(current) = tree.get(path) {
        emitter.emit(path, current);
    }
    if let Some(top) = path::top_segment(path) {
        let subtree = tree.get(top).cloned().unwrap_or(Value::Null);
        emitter.emit(top, &subtree);
    }
}

/// Normalizes an inbound sort direction. `None` means sorting is disabled.
///
/// `false` and `"false"` disable; numbers and numeric strings pass through;
/// anything else (missing, zero, garbage) becomes [`DEFAULT_WAY`].
pub fn normalize_way(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s == "false" => None,
        Some(v) => Some(parse_int(v).filter(|w| *w != 0).unwrap_or(DEFAULT_WAY)),
        None => Some(DEFAULT_WAY),
    }
}

/// The wire form of a normalized direction.
pub fn way_to_value(way: Option<i64>) -> Value {
    match way {
        Some(w) => Value::from(w),
        None => Value::Bool(false),
    }
}
