use serde_json::{Map, Value};
use slate_grid::path::encode_key;
use slate_grid::{StateStore, Subscription, qs};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::transport::Transport;

/// Emitted when a request starts and again when it finishes. The payload is
/// the loading flag.
pub const UPDATE_EVENT: &str = "update";

/// Server-only state the mirror never sends back.
const RESULT_KEYS: [&str; 2] = ["rows", "count"];

/// Response blocks with their own slot; every other top-level entry is an
/// include.
const RESPONSE_BLOCKS: [&str; 3] = ["data", "state", "alter"];

/// Client-side replica of a grid.
///
/// Holds the server's `data` block as declared values, its `state` block as
/// state, `alter` as the viewer's alteration and any other top-level entry
/// as an include. [`GridMirror::update`] pushes local state into the
/// location and the server, then folds the response back in.
pub struct GridMirror<T: Transport> {
    store: StateStore,
    transport: T,
    location: String,
    updates: Map<String, Value>,
    altered: bool,
    loading: bool,
}

impl<T: Transport> GridMirror<T> {
    pub fn new(transport: T, data: Value, state: Value) -> Self {
        let mut store = StateStore::with_declared(data);
        if let Value::Object(state) = state {
            for (key, value) in state {
                store.state_set(&key, value);
            }
        }
        Self {
            store,
            transport,
            location: String::new(),
            updates: Map::new(),
            altered: false,
            loading: false,
        }
    }

    /// Hydrates from a rendered server response.
    pub fn from_response(transport: T, response: &Value) -> Self {
        let mut mirror = Self::new(transport, Value::Null, Value::Null);
        mirror.reconcile(response.clone());
        mirror
    }

    /// The page location (`/path?query`) state is written into.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.store.get(path)
    }

    pub fn set(&mut self, path: &str, value: Value) -> &mut Self {
        self.store.set(path, value);
        self
    }

    pub fn state_get(&self, path: &str, fallback: bool) -> Option<&Value> {
        self.store.state_get(path, fallback)
    }

    pub fn state_set(&mut self, path: &str, value: Value) -> &mut Self {
        self.store.state_set(path, value);
        self
    }

    pub fn on(
        &self,
        path: impl Into<String>,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.on(path, listener)
    }

    pub fn filter(&mut self, key: &str, value: Value) -> &mut Self {
        self.state_set(&format!("filter.{}", encode_key(key)), value)
    }

    pub fn sort(&mut self, key: &str, way: i64) -> &mut Self {
        self.state_set("sort.sort", Value::String(encode_key(key)))
            .state_set("sort.way", Value::from(way))
    }

    pub fn page(&mut self, page: usize) -> &mut Self {
        self.state_set("page", Value::from(page))
    }

    /// Queues an inline edit for the next [`GridMirror::update`].
    pub fn queue_update(&mut self, id: &str, column: &str, value: Value) -> &mut Self {
        let row = self
            .updates
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(row) = row {
            row.insert(encode_key(column), value);
        }
        self
    }

    pub fn pending_updates(&self) -> &Map<String, Value> {
        &self.updates
    }

    /// Changes the viewer's alteration locally. The whole alteration goes
    /// out with the next [`GridMirror::update`].
    pub fn alter(&mut self, path: &str, value: Value) -> &mut Self {
        self.store.alteration_set(path, value);
        self.altered = true;
        self
    }

    pub fn alteration(&self) -> &Value {
        self.store.alteration().as_value()
    }

    pub fn has_pending_alteration(&self) -> bool {
        self.altered
    }

    pub fn included(&self) -> &Map<String, Value> {
        self.store.included()
    }

    pub fn rows(&self) -> &[Value] {
        self.store
            .state_get("rows", false)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self) -> u64 {
        self.store
            .state_get("count", false)
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// State as it goes over the wire: everything but the result set.
    fn outbound_state(&self) -> Map<String, Value> {
        let mut state = self.store.state().as_map().clone();
        for key in RESULT_KEYS {
            state.remove(key);
        }
        state
    }

    /// Rewrites the location query with the current state. Grids with an
    /// id scope their state under it so several grids can share a page.
    fn push_location(&mut self, state: &Map<String, Value>) {
        let (path, query) = match self.location.split_once('?') {
            Some((path, query)) => (path.to_string(), qs::parse(query)),
            None => (self.location.clone(), Map::new()),
        };
        let mut query = query;
        match self.store.get("id").and_then(Value::as_str) {
            Some(id) => {
                query.insert(id.to_string(), Value::Object(state.clone()));
            }
            None => query.extend(state.clone()),
        }
        self.location = format!("{path}?{}", qs::stringify(&query));
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.store.emitter().emit(UPDATE_EVENT, &Value::Bool(loading));
    }

    /// Sends state and pending edits to the grid's route and reconciles the
    /// response. Loading is cleared and `update` emitted whether or not the
    /// request succeeds; edits are only dropped once the server has them.
    pub fn update(&mut self) -> Result<(), ClientError> {
        self.set_loading(true);
        let result = self.round_trip();
        self.set_loading(false);
        result
    }

    fn round_trip(&mut self) -> Result<(), ClientError> {
        let route = self
            .store
            .get("route")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ClientError::MissingRoute)?;

        let state = self.outbound_state();
        self.push_location(&state);

        let mut body = state;
        body.insert("update".into(), Value::Object(self.updates.clone()));
        if self.altered {
            body.insert("alter".into(), self.alteration().clone());
        }
        debug!(route = %route, updates = self.updates.len(), altered = self.altered, "grid update");

        let response = match self.transport.send(&route, &body) {
            Ok(response) => response,
            Err(e) => {
                warn!(route = %route, error = %e, "grid update failed");
                return Err(e);
            }
        };
        self.updates.clear();
        self.altered = false;
        self.reconcile(response);
        Ok(())
    }

    fn reconcile(&mut self, response: Value) {
        let Value::Object(mut response) = response else {
            return;
        };
        if let Some(Value::Object(data)) = response.remove("data") {
            for (key, value) in data {
                self.store.set(&key, value);
            }
        }
        if let Some(Value::Object(state)) = response.remove("state") {
            for (key, value) in state {
                self.store.state_set(&key, value);
            }
        }
        if let Some(alter) = response.remove("alter") {
            self.store.replace_alteration(alter);
        }
        response.retain(|key, _| !RESPONSE_BLOCKS.contains(&key.as_str()));
        self.store.include(response);
    }
}
