use std::future::Future;
use std::sync::Arc;

use bson::Bson;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::GridError;
use crate::query::GridQuery;
use crate::registry::Descriptor;
use crate::request::RequestContext;

/// Turns a raw field value into its rendered form. Gets the whole row too.
pub type Formatter<R> =
    Arc<dyn Fn(Bson, &R) -> BoxFuture<'static, Result<Bson, GridError>> + Send + Sync>;

/// Applies a computed sort and hands back the new query.
pub type SortFn<Q> = Arc<dyn Fn(Q, i64) -> BoxFuture<'static, Result<Q, GridError>> + Send + Sync>;

/// Persists an inline edit for one cell.
pub type Updater<R> = Arc<
    dyn Fn(&RequestContext, &R, Value) -> BoxFuture<'static, Result<(), GridError>> + Send + Sync,
>;

pub enum ColumnSort<Q> {
    Disabled,
    /// Use the store's own sort on the column key.
    Default,
    Custom(SortFn<Q>),
}

impl<Q> ColumnSort<Q> {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ColumnSort::Disabled)
    }
}

impl<Q> Clone for ColumnSort<Q> {
    fn clone(&self) -> Self {
        match self {
            ColumnSort::Disabled => ColumnSort::Disabled,
            ColumnSort::Default => ColumnSort::Default,
            ColumnSort::Custom(f) => ColumnSort::Custom(Arc::clone(f)),
        }
    }
}

pub struct ColumnUpdate<R> {
    /// Input widget name the client should render for editing.
    pub tag: Option<String>,
    pub submit: Updater<R>,
}

impl<R> Clone for ColumnUpdate<R> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            submit: Arc::clone(&self.submit),
        }
    }
}

pub struct Column<Q: GridQuery> {
    pub title: String,
    pub tag: Option<String>,
    pub meta: Option<Value>,
    pub width: Option<Value>,
    pub input: Option<Value>,
    pub hidden: bool,
    pub export: bool,
    pub priority: Option<i64>,
    pub sort: ColumnSort<Q>,
    pub format: Option<Formatter<Q::Row>>,
    pub export_format: Option<Formatter<Q::Row>>,
    pub update: Option<ColumnUpdate<Q::Row>>,
}

impl<Q: GridQuery> Clone for Column<Q> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            tag: self.tag.clone(),
            meta: self.meta.clone(),
            width: self.width.clone(),
            input: self.input.clone(),
            hidden: self.hidden,
            export: self.export,
            priority: self.priority,
            sort: self.sort.clone(),
            format: self.format.clone(),
            export_format: self.export_format.clone(),
            update: self.update.clone(),
        }
    }
}

impl<Q: GridQuery> Column<Q> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tag: None,
            meta: None,
            width: None,
            input: None,
            hidden: false,
            export: true,
            priority: None,
            sort: ColumnSort::Disabled,
            format: None,
            export_format: None,
            update: None,
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn width(mut self, width: impl Into<Value>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sort = ColumnSort::Default;
        self
    }

    pub fn sort_with<F, Fut>(mut self, sort: F) -> Self
    where
        F: Fn(Q, i64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q, GridError>> + Send + 'static,
    {
        self.sort = ColumnSort::Custom(Arc::new(move |query, way| {
            let fut: BoxFuture<'static, Result<Q, GridError>> = Box::pin(sort(query, way));
            fut
        }));
        self
    }

    pub fn format<F>(mut self, format: F) -> Self
    where
        F: Fn(Bson, &Q::Row) -> Bson + Send + Sync + 'static,
    {
        self.format = Some(ready_formatter(format));
        self
    }

    pub fn format_async<F, Fut>(mut self, format: F) -> Self
    where
        F: Fn(Bson, &Q::Row) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bson, GridError>> + Send + 'static,
    {
        self.format = Some(async_formatter(format));
        self
    }

    /// Formatter used only for exports; takes precedence over `format`.
    pub fn export_format<F>(mut self, format: F) -> Self
    where
        F: Fn(Bson, &Q::Row) -> Bson + Send + Sync + 'static,
    {
        self.export_format = Some(ready_formatter(format));
        self
    }

    pub fn export_format_async<F, Fut>(mut self, format: F) -> Self
    where
        F: Fn(Bson, &Q::Row) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bson, GridError>> + Send + 'static,
    {
        self.export_format = Some(async_formatter(format));
        self
    }

    pub fn update<F, Fut>(mut self, tag: Option<&str>, submit: F) -> Self
    where
        F: Fn(&RequestContext, &Q::Row, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), GridError>> + Send + 'static,
    {
        let submit: Updater<Q::Row> = Arc::new(move |ctx: &RequestContext, row: &Q::Row, value| {
            let fut: BoxFuture<'static, Result<(), GridError>> = Box::pin(submit(ctx, row, value));
            fut
        });
        self.update = Some(ColumnUpdate {
            tag: tag.map(str::to_string),
            submit,
        });
        self
    }
}

impl<Q: GridQuery> Descriptor for Column<Q> {
    fn priority(&self) -> Option<i64> {
        self.priority
    }

    fn hidden(&self) -> bool {
        self.hidden
    }

    fn exportable(&self) -> bool {
        self.export
    }
}

fn ready_formatter<R, F>(format: F) -> Formatter<R>
where
    R: 'static,
    F: Fn(Bson, &R) -> Bson + Send + Sync + 'static,
{
    Arc::new(move |value: Bson, row: &R| {
        let out = format(value, row);
        let fut: BoxFuture<'static, Result<Bson, GridError>> = Box::pin(async move { Ok(out) });
        fut
    })
}

fn async_formatter<R, F, Fut>(format: F) -> Formatter<R>
where
    R: 'static,
    F: Fn(Bson, &R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bson, GridError>> + Send + 'static,
{
    Arc::new(move |value: Bson, row: &R| {
        let fut: BoxFuture<'static, Result<Bson, GridError>> = Box::pin(format(value, row));
        fut
    })
}
