use bson::Bson;
use futures::future::try_join_all;
use serde_json::{Map, Value};

use crate::column::Column;
use crate::error::GridError;
use crate::path::encode_key;
use crate::query::{GridQuery, GridRow};
use crate::registry::{OrderContext, Registry};
use crate::value::display;

/// Renders fetched rows for the response.
///
/// In model mode each row is its sanitized form plus `_id`; otherwise each
/// row is `_id` followed by one display string per column, keyed by the
/// wire-safe column key. Rows and cells are formatted concurrently but keep
/// their order.
pub async fn project_rows<Q: GridQuery>(
    rows: &[Q::Row],
    columns: &Registry<Column<Q>>,
    models: bool,
) -> Result<Vec<Value>, GridError> {
    try_join_all(rows.iter().map(|row| project_row(row, columns, models))).await
}

async fn project_row<Q: GridQuery>(
    row: &Q::Row,
    columns: &Registry<Column<Q>>,
    models: bool,
) -> Result<Value, GridError> {
    if models {
        let mut model = row.sanitise().await.unwrap_or_default();
        model.insert("_id".to_string(), Value::String(row.id()));
        return Ok(Value::Object(model));
    }

    let order = columns.resolve_order(OrderContext::Display);
    let cells = try_join_all(order.into_iter().map(|(key, column)| async move {
        let raw = row.get(key).await.unwrap_or(Bson::Null);
        let value = match &column.format {
            Some(format) => format(raw, row).await?,
            None => raw,
        };
        Ok::<_, GridError>((encode_key(key), Value::String(display(&value))))
    }))
    .await?;

    let mut projected = Map::with_capacity(cells.len() + 1);
    projected.insert("_id".to_string(), Value::String(row.id()));
    projected.extend(cells);
    Ok(Value::Object(projected))
}
