use crate::domain::ports::ReportRenderer;
use crate::domain::report::{ComparisonRow, Report};
use crate::utils::error::{ReconcileError, Result};

/// 純資料的 CSV 輸出，不帶樣式
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl ReportRenderer for CsvRenderer {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(ComparisonRow::COLUMNS)?;

        for row in &report.rows {
            writer.write_record(row.cells().iter().map(ToString::to_string))?;
        }

        writer
            .into_inner()
            .map_err(|e| ReconcileError::render(format!("CSV flush failed: {}", e)))
    }
}
