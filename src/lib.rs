pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{LocalStorage, OcrMyPdfTextSource, OpenAiFieldExtractor};
pub use core::{CancelToken, ReconcileEngine, ReconcilePipeline, RunOutcome, RunSummary};
pub use utils::error::{ReconcileError, Result};
