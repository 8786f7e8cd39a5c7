mod csv;
mod markup;
mod xlsx;

pub use self::csv::CsvExporter;
pub use self::markup::strip_markup;
pub use self::xlsx::XlsxExporter;

use std::collections::HashMap;
use std::sync::Arc;

use bson::Bson;
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde_json::Value;

use crate::column::Column;
use crate::error::GridError;
use crate::query::{GridQuery, GridRow};
use crate::registry::{OrderContext, Registry};
use crate::value::display;

/// Rows flattened to display strings, headed by column titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Serializers refuse to write a file with nothing in it.
    pub fn ensure_exportable(&self) -> Result<(), GridError> {
        if self.fields.is_empty() {
            return Err(GridError::Export("no exportable columns".into()));
        }
        if self.rows.is_empty() {
            return Err(GridError::Export("no rows to export".into()));
        }
        Ok(())
    }
}

/// Serializes an [`ExportTable`] into a downloadable file.
pub trait Exporter: Send + Sync {
    fn extension(&self) -> &str;

    fn content_type(&self) -> &str;

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, GridError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What an export request produced: a file, or the regular JSON response
/// when no exporter handles the requested type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    File(ExportFile),
    Rendered(Value),
}

/// Exporters keyed by export type. `csv` and `xlsx` are registered up front.
#[derive(Clone)]
pub struct ExportRegistry {
    handlers: HashMap<String, Arc<dyn Exporter>>,
}

impl Default for ExportRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("csv", CsvExporter);
        registry.register("xlsx", XlsxExporter);
        registry
    }
}

impl std::fmt::Debug for ExportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("ExportRegistry").field("kinds", &kinds).finish()
    }
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registering an existing kind replaces its handler.
    pub fn register(&mut self, kind: impl Into<String>, exporter: impl Exporter + 'static) {
        self.handlers.insert(kind.into(), Arc::new(exporter));
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn Exporter>> {
        self.handlers.get(kind)
    }
}

/// Projects rows through the exportable columns. Each cell uses the export
/// formatter, falling back to the display formatter, and is reduced to
/// plain text.
pub async fn project_export<Q: GridQuery>(
    rows: &[Q::Row],
    columns: &Registry<Column<Q>>,
) -> Result<ExportTable, GridError> {
    let order = columns.resolve_order(OrderContext::Export);
    let fields = order.iter().map(|(_, column)| column.title.clone()).collect();

    let rows = try_join_all(rows.iter().map(|row| {
        let order = &order;
        async move {
            try_join_all(order.iter().map(|(key, column)| async move {
                let raw = row.get(key).await.unwrap_or(Bson::Null);
                let value = match column.export_format.as_ref().or(column.format.as_ref()) {
                    Some(format) => format(raw, row).await?,
                    None => raw,
                };
                Ok::<_, GridError>(strip_markup(&display(&value)))
            }))
            .await
        }
    }))
    .await?;

    Ok(ExportTable { fields, rows })
}

/// `<base>-<DD-MM-YYYY>.<ext>`
pub fn export_filename(base: &str, extension: &str, date: NaiveDate) -> String {
    format!("{base}-{}.{extension}", date.format("%d-%m-%Y"))
}
