use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::column::{Column, ColumnSort};
use crate::error::GridError;
use crate::filter::FilterDef;
use crate::path;
use crate::query::GridQuery;
use crate::registry::Registry;
use crate::state::{StateStore, normalize_way};
use crate::value::{is_blank, parse_int, to_bson};

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_PAGE: usize = 1;

/// The sort a request resolved to. `None` fields go over the wire as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub sort: Option<String>,
    pub way: Option<i64>,
}

impl Serialize for SortState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SortState", 2)?;
        match self.way {
            Some(way) => s.serialize_field("way", &way)?,
            None => s.serialize_field("way", &false)?,
        }
        match &self.sort {
            Some(sort) => s.serialize_field("sort", &path::encode_key(sort))?,
            None => s.serialize_field("sort", &false)?,
        }
        s.end()
    }
}

/// One executed page.
#[derive(Debug, Clone)]
pub struct Resolution<R> {
    pub sort: SortState,
    pub count: u64,
    pub limit: usize,
    pub page: usize,
    pub skip: usize,
    pub rows: Vec<R>,
}

impl<R> Resolution<R> {
    pub fn empty(sort: SortState, limit: usize, page: usize) -> Self {
        Self {
            sort,
            count: 0,
            limit,
            page,
            skip: skip_for(limit, page),
            rows: Vec::new(),
        }
    }
}

pub fn skip_for(limit: usize, page: usize) -> usize {
    limit.saturating_mul(page.saturating_sub(1))
}

/// Page size from state, then declared, then [`DEFAULT_LIMIT`].
pub fn resolve_limit(state: &StateStore) -> usize {
    positive_setting(state, "limit").unwrap_or(DEFAULT_LIMIT)
}

pub fn resolve_page(state: &StateStore) -> usize {
    positive_setting(state, "page").unwrap_or(DEFAULT_PAGE)
}

/// A request value that is not a positive integer reads through to the
/// declared one.
fn positive_setting(state: &StateStore, key: &str) -> Option<usize> {
    positive(state.state_get(key, false)).or_else(|| positive(state.get(key)))
}

fn positive(value: Option<&Value>) -> Option<usize> {
    value
        .and_then(parse_int)
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
}

/// The filter value a request carries for `key`, if it is set and not blank.
pub fn filter_value<'a>(state: &'a StateStore, key: &str) -> Option<&'a Value> {
    let wire = format!("filter.{}", path::encode_key(key));
    state
        .state_get(&wire, false)
        .or_else(|| state.state_get(&format!("filter.{key}"), false))
        .filter(|value| !is_blank(value))
}

/// Applies every set filter to `query`, in registry order.
pub async fn resolve_filter<Q: GridQuery>(
    mut query: Q,
    filters: &Registry<FilterDef<Q>>,
    state: &StateStore,
) -> Result<Q, GridError> {
    for (key, def) in filters.iter() {
        let Some(value) = filter_value(state, key) else {
            continue;
        };
        query = match &def.query {
            Some(custom) => custom(query, value.clone()).await?,
            None => query.eq(key, to_bson(value)?),
        };
        debug!(filter = key, "applied grid filter");
    }
    Ok(query)
}

/// The requested sort, with declared fallbacks and direction normalized.
pub fn sort_state(state: &StateStore) -> SortState {
    let way = normalize_way(state.state_get("sort.way", true));
    let sort = way.and_then(|_| {
        state
            .state_get("sort.sort", true)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty() && *s != "false")
            .map(path::decode_key)
    });
    SortState { sort, way }
}

/// Applies the requested sort. A column whose sort is disabled ignores the
/// request; a key with no column sorts on the raw field.
pub async fn resolve_sort<Q: GridQuery>(
    query: Q,
    columns: &Registry<Column<Q>>,
    state: &StateStore,
) -> Result<(Q, SortState), GridError> {
    let sort = sort_state(state);
    let (Some(key), Some(way)) = (sort.sort.as_deref(), sort.way) else {
        return Ok((query, sort));
    };

    let query = match columns.get(key).map(|c| &c.sort) {
        Some(ColumnSort::Custom(custom)) => custom(query, way).await?,
        Some(ColumnSort::Default) | None => query.sort(key, way),
        Some(ColumnSort::Disabled) => {
            debug!(sort = key, "sort requested on a non-sortable column");
            query
        }
    };
    Ok((query, sort))
}

/// Filter, sort, count, then fetch one page from the same query.
pub async fn resolve<Q: GridQuery>(
    query: Q,
    columns: &Registry<Column<Q>>,
    filters: &Registry<FilterDef<Q>>,
    state: &StateStore,
) -> Result<Resolution<Q::Row>, GridError> {
    let query = resolve_filter(query, filters, state).await?;
    let (query, sort) = resolve_sort(query, columns, state).await?;

    let count = query.count().await?;
    let limit = resolve_limit(state);
    let page = resolve_page(state);
    let skip = skip_for(limit, page);
    let rows = query.skip(skip).limit(limit).find().await?;

    debug!(count, limit, page, rows = rows.len(), "resolved grid page");
    Ok(Resolution {
        sort,
        count,
        limit,
        page,
        skip,
        rows,
    })
}

/// Every row that passes filters, sorted, with no pagination.
pub async fn resolve_all<Q: GridQuery>(
    query: Q,
    columns: &Registry<Column<Q>>,
    filters: &Registry<FilterDef<Q>>,
    state: &StateStore,
) -> Result<Vec<Q::Row>, GridError> {
    let query = resolve_filter(query, filters, state).await?;
    let (query, _) = resolve_sort(query, columns, state).await?;
    query.find().await
}
