use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::alteration::{AlterationStore, GridRecord, record_key};
use crate::column::Column;
use crate::error::GridError;
use crate::export::{
    ExportFile, ExportOutcome, ExportRegistry, Exporter, export_filename, project_export,
};
use crate::filter::FilterDef;
use crate::merge::merge_into;
use crate::path::{decode_key, encode_key};
use crate::project::project_rows;
use crate::query::GridQuery;
use crate::registry::Registry;
use crate::request::{CONTROL_KEYS, RequestContext};
use crate::resolver::{self, Resolution};
use crate::response::{column_meta, filter_meta};
use crate::state::{StateStore, normalize_way, way_to_value};
use crate::update::apply_updates;

/// One server-side grid: registries, state and collaborators.
///
/// A grid is built per request. [`Grid::render`] folds the request into
/// state, runs inline updates and alterations, resolves the page and
/// returns the wire response.
pub struct Grid<Q: GridQuery> {
    model: Option<Q>,
    columns: Registry<Column<Q>>,
    filters: Registry<FilterDef<Q>>,
    store: StateStore,
    alterations: Option<Arc<dyn AlterationStore>>,
    exporters: ExportRegistry,
}

impl<Q: GridQuery> Default for Grid<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: GridQuery> Grid<Q> {
    pub fn new() -> Self {
        Self {
            model: None,
            columns: Registry::new(),
            filters: Registry::new(),
            store: StateStore::new(),
            alterations: None,
            exporters: ExportRegistry::new(),
        }
    }

    // ── Builder ─────────────────────────────────────────────────

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.store.set("id", Value::String(id.into()));
        self
    }

    /// Client row template name.
    pub fn row(mut self, row: impl Into<String>) -> Self {
        self.store.set("row", Value::String(row.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.store.set("limit", Value::from(limit));
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.store.set("page", Value::from(page));
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.store.set("route", Value::String(route.into()));
        self
    }

    /// Render rows through their own sanitizer instead of the columns.
    pub fn models(mut self, models: bool) -> Self {
        self.store.set("models", Value::Bool(models));
        self
    }

    pub fn model(mut self, model: Q) -> Self {
        self.store.set("model", Value::String(model.model_name()));
        self.model = Some(model);
        self
    }

    /// Seeds the sort state. `way` takes the same forms a request does.
    pub fn sort(mut self, key: &str, way: impl Into<Value>) -> Self {
        let way = normalize_way(Some(&way.into()));
        self.store
            .state_set("sort.sort", Value::String(key.to_string()))
            .state_set("sort.way", way_to_value(way));
        self
    }

    /// Extra top-level response entries.
    pub fn include(mut self, extra: Map<String, Value>) -> Self {
        self.store.include(extra);
        self
    }

    pub fn column(mut self, key: impl Into<String>, column: Column<Q>) -> Self {
        self.columns.define(key, column);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, filter: FilterDef<Q>) -> Self {
        self.filters.define(key, filter);
        self
    }

    pub fn alterations(mut self, store: Arc<dyn AlterationStore>) -> Self {
        self.alterations = Some(store);
        self
    }

    /// Registers (or replaces) the exporter for `kind`.
    pub fn exporter(mut self, kind: impl Into<String>, exporter: impl Exporter + 'static) -> Self {
        self.exporters.register(kind, exporter);
        self
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn query(&self) -> Option<&Q> {
        self.model.as_ref()
    }

    pub fn columns(&self) -> &Registry<Column<Q>> {
        &self.columns
    }

    pub fn filters(&self) -> &Registry<FilterDef<Q>> {
        &self.filters
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    fn is_models(&self) -> bool {
        matches!(self.store.get("models"), Some(Value::Bool(true)))
    }

    fn declared_str(&self, path: &str) -> Option<&str> {
        self.store.get(path).and_then(Value::as_str)
    }

    // ── Request handling ────────────────────────────────────────

    /// Folds request parameters into state. Control keys are left for
    /// the operations that consume them.
    pub fn apply_request(&mut self, ctx: &RequestContext) {
        for (key, value) in self.scoped_params(ctx) {
            if CONTROL_KEYS.contains(&key.as_str()) {
                continue;
            }
            match key.as_str() {
                "sort" => self.apply_sort(value),
                "way" => {
                    let way = normalize_way(Some(&value));
                    self.store.state_set("sort.way", way_to_value(way));
                }
                "rows" => {
                    self.store.state_set("limit", value);
                }
                "filter" => {
                    let Value::Object(filters) = value else {
                        continue;
                    };
                    for (filter, value) in filters {
                        self.store
                            .state_set(&format!("filter.{}", encode_key(&filter)), value);
                    }
                }
                _ => {
                    self.store.state_set(&key, value);
                }
            }
        }
    }

    /// Request params, with any `<grid id>[...]` query entries lifted to the
    /// top level. Body entries still win.
    fn scoped_params(&self, ctx: &RequestContext) -> Map<String, Value> {
        let mut params = ctx.params();
        let Some(id) = self.declared_str("id") else {
            return params;
        };
        if let Some(Value::Object(scoped)) = params.remove(id) {
            for (key, value) in scoped {
                if !ctx.body.contains_key(&key) {
                    params.insert(key, value);
                }
            }
        }
        params
    }

    fn apply_sort(&mut self, value: Value) {
        match value {
            Value::Object(sort) => {
                if let Some(key) = sort.get("sort") {
                    self.store.state_set("sort.sort", sort_key(key));
                }
                if let Some(way) = sort.get("way") {
                    self.store
                        .state_set("sort.way", way_to_value(normalize_way(Some(way))));
                }
            }
            other => {
                self.store.state_set("sort.sort", sort_key(&other));
            }
        }
    }

    /// Resolves the current state into one page of rows.
    pub async fn resolve(&self) -> Result<Resolution<Q::Row>, GridError> {
        match &self.model {
            Some(model) => {
                resolver::resolve(model.clone(), &self.columns, &self.filters, &self.store).await
            }
            None => Ok(Resolution::empty(
                resolver::sort_state(&self.store),
                resolver::resolve_limit(&self.store),
                resolver::resolve_page(&self.store),
            )),
        }
    }

    /// Handles one request end to end and returns the response payload.
    pub async fn render(&mut self, ctx: &RequestContext) -> Result<Value, GridError> {
        self.apply_request(ctx);

        if let (Some(updates), Some(model)) = (ctx.updates(), &self.model) {
            apply_updates(model, &self.columns, ctx, updates).await?;
        }
        self.load_alteration(ctx).await?;

        let resolution = self.resolve().await?;
        let rows = project_rows(&resolution.rows, &self.columns, self.is_models()).await?;
        self.respond(&resolution, rows)
    }

    /// Reads the viewer's alteration record and applies any alteration the
    /// request carries. Only attributed viewers get theirs persisted.
    async fn load_alteration(&mut self, ctx: &RequestContext) -> Result<(), GridError> {
        let key = record_key(
            self.declared_str("id"),
            ctx.viewer.as_deref(),
            ctx.session.as_deref(),
            self.declared_str("route"),
        );
        let mut record = match &self.alterations {
            Some(store) => store.find_one(&key).await?,
            None => None,
        }
        .unwrap_or_else(|| GridRecord::new(key));

        if let Some(alter) = ctx.alter() {
            record.alter = alter.clone();
            if let (Some(store), Some(viewer)) = (&self.alterations, ctx.viewer.as_deref()) {
                debug!(key = %record.key, viewer, "saving grid alteration");
                store.save(record.clone()).await?;
            }
        }

        self.store.replace_alteration(record.alter);
        Ok(())
    }

    fn respond(
        &self,
        resolution: &Resolution<Q::Row>,
        rows: Vec<Value>,
    ) -> Result<Value, GridError> {
        let mut state = self.store.state().as_map().clone();
        state.insert("page".into(), Value::from(resolution.page));
        state.insert("sort".into(), serde_json::to_value(&resolution.sort)?);
        state.insert("limit".into(), Value::from(resolution.limit));
        state.insert("count".into(), Value::from(resolution.count));
        state.insert("rows".into(), Value::Array(rows));

        let declared = |path: &str| self.store.get(path).cloned().unwrap_or(Value::Null);
        let mut data = Map::new();
        data.insert("id".into(), declared("id"));
        data.insert("row".into(), declared("row"));
        if self.is_models() {
            data.insert("model".into(), declared("model"));
        }
        data.insert("route".into(), declared("route"));
        data.insert("column".into(), Value::Object(column_meta(&self.columns)));
        data.insert("filter".into(), Value::Object(filter_meta(&self.filters)));

        let alteration = self.store.alteration().as_value();
        let mut response = json!({
            "state": state,
            "data": data,
            "alter": alteration,
        });
        merge_into(&mut response, alteration);
        if let Value::Object(response) = &mut response {
            for (key, value) in self.store.included() {
                response.insert(key.clone(), value.clone());
            }
        }
        Ok(response)
    }

    // ── Export ──────────────────────────────────────────────────

    /// Exports the full filtered and sorted result set in the format the
    /// request names. Requests without an export type render as usual.
    pub async fn export(&mut self, ctx: &RequestContext) -> Result<ExportOutcome, GridError> {
        match ctx.export_type() {
            Some(kind) => self.export_as(ctx, kind).await,
            None => Ok(ExportOutcome::Rendered(self.render(ctx).await?)),
        }
    }

    pub async fn export_as(
        &mut self,
        ctx: &RequestContext,
        kind: &str,
    ) -> Result<ExportOutcome, GridError> {
        let Some(exporter) = self.exporters.get(kind).cloned() else {
            warn!(kind, "no exporter for type, rendering JSON instead");
            return Ok(ExportOutcome::Rendered(self.render(ctx).await?));
        };
        self.apply_request(ctx);

        let rows = match &self.model {
            Some(model) => {
                resolver::resolve_all(model.clone(), &self.columns, &self.filters, &self.store)
                    .await?
            }
            None => Vec::new(),
        };
        let table = project_export(&rows, &self.columns).await?;
        let bytes = exporter.export(&table)?;

        let base = self
            .declared_str("id")
            .map(str::to_string)
            .or_else(|| self.model.as_ref().map(Q::model_name))
            .unwrap_or_else(|| "export".to_string());
        let filename = export_filename(
            &base,
            exporter.extension(),
            chrono::Local::now().date_naive(),
        );
        debug!(kind, filename = %filename, rows = table.rows.len(), "exported grid");

        Ok(ExportOutcome::File(ExportFile {
            filename,
            content_type: exporter.content_type().to_string(),
            bytes,
        }))
    }
}

fn sort_key(value: &Value) -> Value {
    match value.as_str() {
        Some(key) if !key.is_empty() && key != "false" => Value::String(decode_key(key)),
        _ => Value::Bool(false),
    }
}
