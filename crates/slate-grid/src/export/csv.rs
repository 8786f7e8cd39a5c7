use super::{ExportTable, Exporter};
use crate::error::GridError;

/// Comma separated values with a header row of column titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn extension(&self) -> &str {
        "csv"
    }

    fn content_type(&self) -> &str {
        "text/csv; charset=utf-8"
    }

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, GridError> {
        table.ensure_exportable()?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&table.fields)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| GridError::Export(format!("flushing csv: {e}")))
    }
}
