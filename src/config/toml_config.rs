use crate::utils::error::{ReconcileError, Result};
use crate::utils::validation::{
    validate_choices, validate_non_empty_string, validate_path, validate_range, validate_url,
    Validate,
};
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

pub const REPORT_FORMATS: [&str; 3] = ["xlsx", "csv", "json"];

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// 一次對帳執行的完整設定，在程式入口建立後一路傳入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub ocr: OcrConfig,
    pub extractor: ExtractorConfig,
    pub report: ReportConfig,
    pub performance: PerformanceConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub promises_dir: Option<PathBuf>,
    pub certificates_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub languages: String,
    pub force_ocr: bool,
    pub ocrmypdf_bin: String,
    pub pdftotext_bin: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: "spa+eng".to_string(),
            force_ocr: false,
            ocrmypdf_bin: "ocrmypdf".to_string(),
            pdftotext_bin: "pdftotext".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub formats: Vec<String>,
    /// chrono 格式字串，產生不含副檔名的檔名
    pub file_stem: String,
    pub compression: CompressionConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            formats: vec!["xlsx".to_string()],
            file_stem: "REPORTE_%Y_%m_%d-%Hh_%Mm".to_string(),
            compression: CompressionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// 未設定時使用報表檔名加上 `.zip`
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub concurrency: usize,
    /// 0 代表沒有期限
    pub deadline_seconds: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            deadline_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ReconcileError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReconcileError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn promises_dir(&self) -> Result<&Path> {
        self.input
            .promises_dir
            .as_deref()
            .ok_or_else(|| ReconcileError::MissingConfigError {
                field: "input.promises_dir".to_string(),
            })
    }

    pub fn certificates_dir(&self) -> Result<&Path> {
        self.input
            .certificates_dir
            .as_deref()
            .ok_or_else(|| ReconcileError::MissingConfigError {
                field: "input.certificates_dir".to_string(),
            })
    }

    /// API key；未設定或仍是 `${...}` 佔位字串時視為缺少
    pub fn api_key(&self) -> Option<&str> {
        self.extractor
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty() && !ENV_VAR.is_match(key))
    }

    pub fn deadline(&self) -> Option<Duration> {
        match self.performance.deadline_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path(
            "input.promises_dir",
            &self.promises_dir()?.to_string_lossy(),
        )?;
        validate_path(
            "input.certificates_dir",
            &self.certificates_dir()?.to_string_lossy(),
        )?;
        validate_path("report.output_dir", &self.report.output_dir.to_string_lossy())?;

        validate_url("extractor.api_base", &self.extractor.api_base)?;
        validate_non_empty_string("extractor.model", &self.extractor.model)?;
        if self.api_key().is_none() {
            return Err(ReconcileError::MissingConfigError {
                field: "extractor.api_key".to_string(),
            });
        }
        validate_range("extractor.temperature", self.extractor.temperature, 0.0, 2.0)?;
        validate_range("extractor.max_tokens", self.extractor.max_tokens, 1, 16_384)?;

        if self.ocr.enabled {
            validate_non_empty_string("ocr.languages", &self.ocr.languages)?;
            validate_non_empty_string("ocr.ocrmypdf_bin", &self.ocr.ocrmypdf_bin)?;
        }
        validate_non_empty_string("ocr.pdftotext_bin", &self.ocr.pdftotext_bin)?;

        validate_range("performance.concurrency", self.performance.concurrency, 1, 64)?;
        validate_choices("report.formats", &self.report.formats, &REPORT_FORMATS)?;
        validate_non_empty_string("report.file_stem", &self.report.file_stem)?;
        validate_file_stem(&self.report.file_stem)?;

        if let Some(filename) = &self.report.compression.filename {
            if !filename.to_ascii_lowercase().ends_with(".zip") {
                return Err(ReconcileError::InvalidConfigValueError {
                    field: "report.compression.filename".to_string(),
                    value: filename.clone(),
                    reason: "Archive name must end with .zip".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// 檔名樣板必須是 chrono 看得懂的格式
fn validate_file_stem(stem: &str) -> Result<()> {
    if StrftimeItems::new(stem).any(|item| matches!(item, Item::Error)) {
        return Err(ReconcileError::InvalidConfigValueError {
            field: "report.file_stem".to_string(),
            value: stem.to_string(),
            reason: "Unknown date format specifier".to_string(),
        });
    }
    Ok(())
}
