use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::column::Column;
use crate::filter::FilterDef;
use crate::path::encode_key;
use crate::query::GridQuery;
use crate::registry::{OrderContext, Registry};

/// Column description sent to clients under `data.column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default)]
    pub sort: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_width")]
    pub width: Value,
    #[serde(default)]
    pub priority: i64,
    /// Input widget tag when the column accepts inline edits, `false` otherwise.
    #[serde(default = "default_update")]
    pub update: Value,
}

fn default_width() -> Value {
    Value::Bool(false)
}

fn default_update() -> Value {
    Value::Bool(false)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default)]
    pub priority: i64,
}

/// Column metadata keyed by wire-safe column key, in display order.
pub fn column_meta<Q: GridQuery>(columns: &Registry<Column<Q>>) -> Map<String, Value> {
    columns
        .resolve_order(OrderContext::Display)
        .into_iter()
        .map(|(key, column)| {
            let id = encode_key(key);
            let update = match &column.update {
                Some(update) => update
                    .tag
                    .clone()
                    .map_or(Value::Bool(true), Value::String),
                None => Value::Bool(false),
            };
            let meta = ColumnMeta {
                id: id.clone(),
                title: column.title.clone(),
                tag: column.tag.clone(),
                meta: column.meta.clone(),
                input: column.input.clone(),
                sort: column.sort.is_enabled(),
                hidden: column.hidden,
                width: column.width.clone().unwrap_or(Value::Bool(false)),
                priority: columns.priority_of(key).unwrap_or_default(),
                update,
            };
            (id, to_object(&meta))
        })
        .collect()
}

/// Filter metadata keyed by wire-safe filter key, in display order.
pub fn filter_meta<Q: GridQuery>(filters: &Registry<FilterDef<Q>>) -> Map<String, Value> {
    filters
        .resolve_order(OrderContext::Display)
        .into_iter()
        .map(|(key, filter)| {
            let id = encode_key(key);
            let meta = FilterMeta {
                id: id.clone(),
                kind: filter.kind.clone(),
                title: filter.title.clone(),
                options: filter.options.clone(),
                priority: filters.priority_of(key).unwrap_or_default(),
            };
            (id, to_object(&meta))
        })
        .collect()
}

fn to_object<T: Serialize>(meta: &T) -> Value {
    // Plain structs of strings and JSON values always serialize.
    serde_json::to_value(meta).unwrap_or(Value::Null)
}
