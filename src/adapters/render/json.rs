use crate::domain::ports::ReportRenderer;
use crate::domain::report::{Classification, ComparisonRow, Report, ReportSummary};
use crate::utils::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(flatten)]
    row: &'a ComparisonRow,
    classification: Classification,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: ReportSummary,
    rows: Vec<JsonRow<'a>>,
}

/// 帶分類結果的 JSON 輸出，給其他系統使用
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let document = JsonReport {
            summary: report.summary(),
            rows: report
                .rows
                .iter()
                .map(|row| JsonRow {
                    row,
                    classification: row.classification(),
                })
                .collect(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
