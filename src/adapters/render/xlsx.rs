use crate::domain::ports::ReportRenderer;
use crate::domain::report::{Cell, Classification, ComparisonRow, Report};
use crate::utils::error::Result;
use rust_xlsxwriter::{Color, Format, Workbook};

pub const SHEET_NAME: &str = "Reporte";

/// 每種分類的整列底色
pub fn fill_color(classification: Classification) -> u32 {
    match classification {
        Classification::Missing => 0xFF9999,
        Classification::Mismatched => 0xFFE6CC,
        Classification::Ok => 0xCCFFCC,
    }
}

/// 依分類上色的 Excel 報表
#[derive(Debug, Clone)]
pub struct XlsxRenderer {
    sheet_name: String,
}

impl Default for XlsxRenderer {
    fn default() -> Self {
        Self {
            sheet_name: SHEET_NAME.to_string(),
        }
    }
}

impl ReportRenderer for XlsxRenderer {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        let header = Format::new().set_bold();
        for (col, title) in ComparisonRow::COLUMNS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (index, row) in report.rows.iter().enumerate() {
            let line = index as u32 + 1;
            let format = Format::new()
                .set_background_color(Color::RGB(fill_color(row.classification())));

            for (col, cell) in row.cells().iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {
                        worksheet.write_blank(line, col, &format)?;
                    }
                    Cell::Text(text) => {
                        worksheet.write_string_with_format(line, col, *text, &format)?;
                    }
                    Cell::Amount(amount) => {
                        worksheet.write_number_with_format(line, col, *amount as f64, &format)?;
                    }
                    Cell::Flag(flag) => {
                        worksheet.write_boolean_with_format(line, col, *flag, &format)?;
                    }
                    Cell::Summary(summary) => {
                        worksheet.write_string_with_format(line, col, summary.as_str(), &format)?;
                    }
                }
            }
        }

        worksheet.autofit();
        Ok(workbook.save_to_buffer()?)
    }
}
