use std::future::Future;

use bson::{Bson, Document};
use serde_json::{Map, Value};
use slate_query::{Filter, FilterGroup, FilterNode, LogicalOp, Operator};

use crate::error::GridError;

/// A composable query over some record store.
///
/// Builder methods consume and return the query so a store can stay
/// immutable; `count` and `find` are the terminal operations. The operator
/// helpers all funnel into [`GridQuery::filter`].
pub trait GridQuery: Clone + Send + Sync + 'static {
    type Row: GridRow;

    /// Name reported as `data.model` when rows are rendered as models.
    fn model_name(&self) -> String;

    fn filter(self, node: FilterNode) -> Self;

    fn sort(self, field: &str, way: i64) -> Self;

    fn skip(self, skip: usize) -> Self;

    fn limit(self, limit: usize) -> Self;

    fn count(&self) -> impl Future<Output = Result<u64, GridError>> + Send;

    fn find(&self) -> impl Future<Output = Result<Vec<Self::Row>, GridError>> + Send;

    /// Looks a single record up by id, ignoring any clauses on `self`.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Self::Row>, GridError>> + Send;

    // ── Operator vocabulary ─────────────────────────────────────

    fn eq(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Eq, value)
    }

    fn ne(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Ne, value)
    }

    fn gt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Gt, value)
    }

    fn gte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Gte, value)
    }

    fn lt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Lt, value)
    }

    fn lte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.condition(field, Operator::Lte, value)
    }

    fn is_in(self, field: &str, values: Vec<Bson>) -> Self {
        self.condition(field, Operator::In, Bson::Array(values))
    }

    fn not_in(self, field: &str, values: Vec<Bson>) -> Self {
        self.condition(field, Operator::Nin, Bson::Array(values))
    }

    /// Regex match against a string field.
    fn matches(self, field: &str, pattern: &str) -> Self {
        self.condition(field, Operator::Match, pattern)
    }

    /// At least one element of an array field satisfies every entry of `doc`.
    fn elem(self, field: &str, doc: Document) -> Self {
        self.condition(field, Operator::Elem, doc)
    }

    fn or(self, children: Vec<FilterNode>) -> Self {
        self.filter(FilterNode::Group(FilterGroup {
            logical: LogicalOp::Or,
            children,
        }))
    }

    fn and(self, children: Vec<FilterNode>) -> Self {
        self.filter(FilterNode::Group(FilterGroup {
            logical: LogicalOp::And,
            children,
        }))
    }

    fn condition(self, field: &str, operator: Operator, value: impl Into<Bson>) -> Self {
        self.filter(FilterNode::Condition(Filter::new(field, operator, value)))
    }
}

/// One record as the grid sees it.
pub trait GridRow: Send + Sync + 'static {
    fn id(&self) -> String;

    /// Field lookup by dotted path. May do its own I/O.
    fn get(&self, field: &str) -> impl Future<Output = Option<Bson>> + Send;

    /// The row's own public representation, used in model mode. Rows that
    /// have none render as just their id.
    fn sanitise(&self) -> impl Future<Output = Option<Map<String, Value>>> + Send {
        async { None }
    }
}

impl GridRow for Document {
    fn id(&self) -> String {
        match self.get("_id") {
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(Bson::String(s)) => s.clone(),
            Some(other) => crate::value::display(other),
            None => String::new(),
        }
    }

    async fn get(&self, field: &str) -> Option<Bson> {
        get_path(self, field).cloned()
    }

    async fn sanitise(&self) -> Option<Map<String, Value>> {
        match Bson::Document(self.clone()).into_relaxed_extjson() {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Dotted-path lookup inside a document; numeric segments index arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let first = doc.get(segments.next()?)?;
    segments.try_fold(first, |node, segment| match node {
        Bson::Document(d) => d.get(segment),
        Bson::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
