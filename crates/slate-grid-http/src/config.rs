use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slate_grid::value::to_bson;
use slate_grid::{Column, FilterDef, Grid, GridError, GridQuery, GridRow, MemoryCollection};
use slate_query::{Filter, FilterNode, Operator};

/// A grid described as data, for serving a static dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub route: String,
    /// Collection name reported as the model.
    pub collection: String,
    #[serde(default)]
    pub row: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub models: bool,
    #[serde(default)]
    pub sort: Option<SortConfig>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    /// Path to a JSON array of records.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: String,
    #[serde(default = "default_way")]
    pub way: i64,
}

fn default_way() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub sort: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_true")]
    pub export: bool,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub width: Option<Value>,
    /// Accept inline edits, written straight back to the record.
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub format: Option<ColumnFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ColumnFormat {
    Upper,
    Lower,
    /// Fixed-point number with `digits` decimals.
    Fixed { digits: usize },
}

impl ColumnFormat {
    pub fn apply(self, value: Bson) -> Bson {
        match (self, value) {
            (ColumnFormat::Upper, Bson::String(s)) => Bson::String(s.to_uppercase()),
            (ColumnFormat::Lower, Bson::String(s)) => Bson::String(s.to_lowercase()),
            (ColumnFormat::Fixed { digits }, value) => match number(&value) {
                Some(n) => Bson::String(format!("{n:.digits$}")),
                None => value,
            },
            (_, value) => value,
        }
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Comparison applied to the filter value. Plain equality when unset.
    #[serde(default)]
    pub operator: Option<Operator>,
}

impl FilterConfig {
    pub fn to_def<Q: GridQuery>(&self) -> FilterDef<Q> {
        let mut def = FilterDef::new(self.kind.clone());
        if let Some(title) = &self.title {
            def = def.title(title.clone());
        }
        if let Some(options) = &self.options {
            def = def.options(options.clone());
        }
        if let Some(priority) = self.priority {
            def = def.priority(priority);
        }
        match self.operator {
            None | Some(Operator::Eq) => def,
            Some(operator) => {
                let field = self.key.clone();
                def.query(move |query: Q, value| {
                    let condition = to_bson(&value)
                        .map(|value| FilterNode::Condition(Filter::new(&field, operator, value)));
                    async move { condition.map(|condition| query.filter(condition)) }
                })
            }
        }
    }
}

impl GridConfig {
    /// A fresh grid over `collection`. Editable columns write through
    /// [`MemoryCollection::update_field`].
    pub fn build(&self, collection: MemoryCollection) -> Grid<MemoryCollection> {
        let mut grid = Grid::new()
            .id(self.id.clone())
            .route(self.route.clone())
            .models(self.models);
        if let Some(row) = &self.row {
            grid = grid.row(row.clone());
        }
        if let Some(limit) = self.limit {
            grid = grid.limit(limit);
        }
        if let Some(sort) = &self.sort {
            grid = grid.sort(&sort.key, sort.way);
        }
        for column in &self.columns {
            grid = grid.column(column.key.clone(), column.to_column(&collection));
        }
        for filter in &self.filters {
            grid = grid.filter(filter.key.clone(), filter.to_def());
        }
        grid.model(collection)
    }
}

impl ColumnConfig {
    pub fn to_column(&self, collection: &MemoryCollection) -> Column<MemoryCollection> {
        let mut column = Column::new(self.title.clone())
            .hidden(self.hidden)
            .export(self.export);
        if self.sort {
            column = column.sortable();
        }
        if let Some(priority) = self.priority {
            column = column.priority(priority);
        }
        if let Some(width) = &self.width {
            column = column.width(width.clone());
        }
        if let Some(format) = self.format {
            column = column.format(move |value, _| format.apply(value));
        }
        if self.editable {
            let store = collection.clone();
            let field = self.key.clone();
            column = column.update(Some("text"), move |_, row: &Document, value| {
                let written = to_bson(&value)
                    .and_then(|value| store.update_field(&row.id(), &field, value));
                async move { written.map(|_| ()) }
            });
        }
        column
    }
}

/// Parses a JSON array of records into documents.
pub fn parse_records(json: &str) -> Result<Vec<Document>, GridError> {
    let records: Vec<Value> = serde_json::from_str(json)?;
    records
        .iter()
        .map(|record| match to_bson(record)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(GridError::Serialization(format!(
                "expected a record object, got {other}"
            ))),
        })
        .collect()
}
