use rust_xlsxwriter::Workbook;

use super::{ExportTable, Exporter};
use crate::error::GridError;

/// A single-sheet workbook. The file is staged in a temp file that is
/// removed once its bytes are read back.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn extension(&self) -> &str {
        "xlsx"
    }

    fn content_type(&self) -> &str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn export(&self, table: &ExportTable) -> Result<Vec<u8>, GridError> {
        table.ensure_exportable()?;
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, field) in table.fields.iter().enumerate() {
            sheet.write_string(0, column(col)?, field)?;
        }
        for (index, row) in table.rows.iter().enumerate() {
            let line = u32::try_from(index + 1)
                .map_err(|_| GridError::Export("too many rows for a worksheet".into()))?;
            for (col, cell) in row.iter().enumerate() {
                sheet.write_string(line, column(col)?, cell)?;
            }
        }

        let staged = tempfile::Builder::new()
            .prefix("slate-grid-")
            .suffix(".xlsx")
            .tempfile()?;
        workbook.save(staged.path())?;
        Ok(std::fs::read(staged.path())?)
    }
}

fn column(index: usize) -> Result<u16, GridError> {
    u16::try_from(index).map_err(|_| GridError::Export("too many columns for a worksheet".into()))
}
