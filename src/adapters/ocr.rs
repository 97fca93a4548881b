//! PDF → 純文字，透過外部工具。
//!
//! `ocrmypdf` 為掃描檔加上文字層，`pdftotext` (Poppler) 再讀出文字。
//! 關閉 OCR 時只對原始文件執行 `pdftotext`。

use crate::config::toml_config::OcrConfig;
use crate::domain::ports::TextSource;
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct OcrMyPdfTextSource {
    config: OcrConfig,
}

impl OcrMyPdfTextSource {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// 組出 ocrmypdf 的參數
    pub fn ocrmypdf_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "--language",
            self.config.languages.as_str(),
            "--rotate-pages",
            "--deskew",
            "--optimize",
            "1",
            "--output-type",
            "pdf",
            "--invalidate-digital-signatures",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.config.force_ocr {
            args.push("--force-ocr".to_string());
        } else {
            args.push("--skip-text".to_string());
        }

        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }

    /// 執行 ocrmypdf，輸出到 `output`
    pub async fn run_ocr(&self, input: &Path, output: &Path) -> Result<()> {
        let args = self.ocrmypdf_args(input, output);
        tracing::debug!("Running {} {}", self.config.ocrmypdf_bin, args.join(" "));

        let result = Command::new(&self.config.ocrmypdf_bin)
            .args(&args)
            .output()
            .await
            .map_err(|e| ocr_error(input, format!("cannot start {}: {}", self.config.ocrmypdf_bin, e)))?;

        if !result.status.success() {
            return Err(ocr_error(
                input,
                format!(
                    "{} exited with {}: {}",
                    self.config.ocrmypdf_bin,
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            ));
        }
        Ok(())
    }

    /// 讀出 PDF 的文字層
    pub async fn extract_text(&self, pdf: &Path) -> Result<String> {
        let result = Command::new(&self.config.pdftotext_bin)
            .args(["-layout", "-enc", "UTF-8", "-eol", "unix"])
            .arg(pdf)
            .arg("-")
            .output()
            .await
            .map_err(|e| ocr_error(pdf, format!("cannot start {}: {}", self.config.pdftotext_bin, e)))?;

        if !result.status.success() {
            return Err(ocr_error(
                pdf,
                format!(
                    "{} exited with {}: {}",
                    self.config.pdftotext_bin,
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&result.stdout).trim().to_string())
    }

    /// 先 OCR 再讀文字，處理後的 PDF 留在 `output`
    pub async fn ocr_into(&self, input: &Path, output: &Path) -> Result<String> {
        self.run_ocr(input, output).await?;
        self.extract_text(output).await
    }
}

fn ocr_error(path: &Path, message: String) -> ReconcileError {
    ReconcileError::OcrError {
        path: PathBuf::from(path),
        message,
    }
}

#[async_trait]
impl TextSource for OcrMyPdfTextSource {
    async fn load_text(&self, path: &Path) -> Result<String> {
        if !self.config.enabled {
            return self.extract_text(path).await;
        }

        // 每份文件用自己的暫存資料夾，平行處理時不會互相覆蓋
        let workdir = tempfile::tempdir()?;
        let ocr_pdf = workdir.path().join("ocr.pdf");
        let text = self.ocr_into(path, &ocr_pdf).await?;

        tracing::debug!("📄 {} → {} characters", path.display(), text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_text_by_default() {
        let source = OcrMyPdfTextSource::new(OcrConfig::default());
        let args = source.ocrmypdf_args(Path::new("in.pdf"), Path::new("out.pdf"));

        assert_eq!(&args[..2], &["--language", "spa+eng"]);
        assert!(args.contains(&"--skip-text".to_string()));
        assert!(!args.contains(&"--force-ocr".to_string()));
        assert_eq!(args[args.len() - 2..], ["in.pdf", "out.pdf"]);
    }

    #[test]
    fn test_force_ocr() {
        let source = OcrMyPdfTextSource::new(OcrConfig {
            force_ocr: true,
            languages: "spa".to_string(),
            ..OcrConfig::default()
        });
        let args = source.ocrmypdf_args(Path::new("in.pdf"), Path::new("out.pdf"));
        assert!(args.contains(&"--force-ocr".to_string()));
        assert!(!args.contains(&"--skip-text".to_string()));
        assert_eq!(args[1], "spa");
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let source = OcrMyPdfTextSource::new(OcrConfig {
            enabled: false,
            pdftotext_bin: "conciliador-no-such-pdftotext".to_string(),
            ..OcrConfig::default()
        });

        let err = source.load_text(Path::new("doc.pdf")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::OcrError { .. }));
        assert!(err.to_string().contains("doc.pdf"));
    }
}
