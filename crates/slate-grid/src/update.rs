use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::column::Column;
use crate::error::GridError;
use crate::path::decode_key;
use crate::query::GridQuery;
use crate::registry::Registry;
use crate::request::RequestContext;

/// Routes `{recordId: {columnKey: value}}` edits to column updaters.
///
/// Unknown records, unknown columns and columns without an updater are
/// skipped. Returns how many updaters ran.
pub async fn apply_updates<Q: GridQuery>(
    model: &Q,
    columns: &Registry<Column<Q>>,
    ctx: &RequestContext,
    updates: &Map<String, Value>,
) -> Result<usize, GridError> {
    let applied = try_join_all(updates.iter().map(|(id, cells)| async move {
        let Some(cells) = cells.as_object() else {
            return Ok(0);
        };
        let Some(row) = model.find_by_id(id).await? else {
            warn!(id = %id, "update for unknown record");
            return Ok(0);
        };
        let row = &row;
        let submitted = try_join_all(cells.iter().filter_map(|(key, value)| {
            let update = columns.get(&decode_key(key))?.update.as_ref()?;
            Some((update.submit)(ctx, row, value.clone()))
        }))
        .await?;
        Ok::<_, GridError>(submitted.len())
    }))
    .await?;

    let total = applied.into_iter().sum();
    debug!(records = updates.len(), cells = total, "applied grid updates");
    Ok(total)
}
