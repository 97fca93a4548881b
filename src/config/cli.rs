use crate::config::TomlConfig;
use crate::utils::error::Result;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

/// 命令列參數；有 `--config` 時先讀檔，再由旗標覆蓋
#[derive(Debug, Clone, Parser)]
#[command(name = "conciliador")]
#[command(about = "Reconcile purchase promises against credit certificates")]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Folder with the purchase-promise PDFs
    #[arg(long)]
    pub promises_dir: Option<PathBuf>,

    /// Folder with the credit-certificate PDFs
    #[arg(long)]
    pub certificates_dir: Option<PathBuf>,

    /// Folder where the report is written
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report formats: xlsx, csv, json
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    /// Bundle every report format into one zip archive
    #[arg(long)]
    pub zip: bool,

    /// Documents processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Cancel the run after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Tesseract languages passed to ocrmypdf (e.g. spa+eng)
    #[arg(long)]
    pub languages: Option<String>,

    /// Skip ocrmypdf and read embedded text only
    #[arg(long)]
    pub no_ocr: bool,

    /// Language model used for field extraction
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the chat-completions API
    #[arg(long)]
    pub api_base: Option<String>,

    /// API key; the flag wins over the config file, OPENAI_API_KEY does not
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// `--api-key` 是否直接出現在命令列 (而不是來自環境變數)
    #[arg(skip)]
    pub api_key_from_flag: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// 解析命令列，並記錄每個值的來源
    pub fn parse_args() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    pub fn parse_args_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_matches(Self::command().get_matches_from(args))
    }

    fn from_matches(matches: ArgMatches) -> Self {
        let mut cli = Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
        cli.api_key_from_flag = matches.value_source("api_key") == Some(ValueSource::CommandLine);
        cli
    }

    /// 合併設定檔與命令列旗標，產生這次執行要用的設定
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(dir) = &self.promises_dir {
            config.input.promises_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.certificates_dir {
            config.input.certificates_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.report.output_dir = dir.clone();
        }
        if !self.formats.is_empty() {
            config.report.formats = self.formats.clone();
        }
        if self.zip {
            config.report.compression.enabled = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.performance.concurrency = concurrency;
        }
        if let Some(deadline) = self.deadline_secs {
            config.performance.deadline_seconds = deadline;
        }
        if let Some(languages) = &self.languages {
            config.ocr.languages = languages.clone();
        }
        if self.no_ocr {
            config.ocr.enabled = false;
        }
        if let Some(model) = &self.model {
            config.extractor.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.extractor.api_base = api_base.clone();
        }
        // 命令列 > 設定檔 > 環境變數
        if let Some(api_key) = &self.api_key {
            if self.api_key_from_flag || config.api_key().is_none() {
                config.extractor.api_key = Some(api_key.clone());
            }
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }

        Ok(config)
    }
}
