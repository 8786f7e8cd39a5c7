use serde_json::{Map, Value};

use crate::qs;

/// Keys that steer a request instead of describing grid state.
pub const CONTROL_KEYS: [&str; 3] = ["update", "alter", "export"];

/// What the hosting layer hands the grid for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
    /// Authenticated viewer, if any.
    pub viewer: Option<String>,
    pub session: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw `a=1&filter[status]=active` query string.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = qs::parse(raw);
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Query parameters overlaid with body entries; the body wins.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = self.query.clone();
        params.extend(self.body.clone());
        params
    }

    /// `{recordId: {columnKey: value}}` edits carried by the request.
    pub fn updates(&self) -> Option<&Map<String, Value>> {
        self.param("update").and_then(Value::as_object)
    }

    pub fn alter(&self) -> Option<&Value> {
        self.param("alter").filter(|v| !v.is_null())
    }

    pub fn export_type(&self) -> Option<&str> {
        self.param("export").and_then(Value::as_str)
    }

    fn param(&self, key: &str) -> Option<&Value> {
        self.body.get(key).or_else(|| self.query.get(key))
    }
}
