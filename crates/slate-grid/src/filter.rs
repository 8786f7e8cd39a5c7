use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::GridError;
use crate::query::GridQuery;
use crate::registry::Descriptor;

/// Custom filter effect: receives the query and the resolved filter value.
pub type FilterQueryFn<Q> =
    Arc<dyn Fn(Q, Value) -> BoxFuture<'static, Result<Q, GridError>> + Send + Sync>;

pub struct FilterDef<Q> {
    pub title: Option<String>,
    pub kind: String,
    pub options: Option<Value>,
    pub priority: Option<i64>,
    pub query: Option<FilterQueryFn<Q>>,
}

impl<Q> Clone for FilterDef<Q> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            kind: self.kind.clone(),
            options: self.options.clone(),
            priority: self.priority,
            query: self.query.clone(),
        }
    }
}

impl<Q: GridQuery> FilterDef<Q> {
    /// `kind` is the client control type (`text`, `select`, `date`...).
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            title: None,
            kind: kind.into(),
            options: None,
            priority: None,
            query: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces the default equality clause entirely.
    pub fn query<F, Fut>(mut self, query: F) -> Self
    where
        F: Fn(Q, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q, GridError>> + Send + 'static,
    {
        self.query = Some(Arc::new(move |q, value| {
            let fut: BoxFuture<'static, Result<Q, GridError>> = Box::pin(query(q, value));
            fut
        }));
        self
    }
}

impl<Q> Descriptor for FilterDef<Q> {
    fn priority(&self) -> Option<i64> {
        self.priority
    }
}
