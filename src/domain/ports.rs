use crate::core::cancel::CancelToken;
use crate::domain::model::{ExtractedRecord, Extraction};
use crate::domain::report::Report;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給使用者看的完整路徑
    fn locate(&self, path: &str) -> String;
}

/// 文件 → 純文字 (OCR 或內嵌文字)
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn load_text(&self, path: &Path) -> Result<String>;
}

/// 純文字 → 欄位
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(&self, text: &str) -> Result<ExtractedRecord>;
}

/// 報表 → 單一輸出檔的位元組
pub trait ReportRenderer: Send + Sync {
    fn extension(&self) -> &'static str;
    fn render(&self, report: &Report) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// `Ok(None)` 代表執行中途被取消
    async fn extract(&self, cancel: &CancelToken) -> Result<Option<Extraction>>;
    async fn transform(&self, extraction: &Extraction) -> Result<Report>;
    async fn load(&self, report: &Report) -> Result<Vec<String>>;
}
