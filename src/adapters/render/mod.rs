pub mod csv;
pub mod json;
pub mod xlsx;

pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::xlsx::XlsxRenderer;

use crate::domain::ports::ReportRenderer;
use crate::utils::error::{ReconcileError, Result};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// 依格式名稱 (xlsx / csv / json) 取得渲染器
pub fn renderer_for(format: &str) -> Result<Box<dyn ReportRenderer>> {
    match format {
        "xlsx" => Ok(Box::new(XlsxRenderer::default())),
        "csv" => Ok(Box::new(CsvRenderer)),
        "json" => Ok(Box::new(JsonRenderer)),
        other => Err(ReconcileError::InvalidConfigValueError {
            field: "report.formats".to_string(),
            value: other.to_string(),
            reason: "Unsupported report format".to_string(),
        }),
    }
}

/// 把多個輸出檔打包成一個 ZIP
pub fn bundle_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
