use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Input validation failed: {message}")]
    InputValidationError { message: String },

    #[error("OCR failed for {}: {message}", path.display())]
    OcrError { path: PathBuf, message: String },

    #[error("Field extraction failed: {message}")]
    ExtractionError { message: String },

    #[error("Report rendering failed: {message}")]
    RenderError { message: String },

    #[error("Worker task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Extraction,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReconcileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InputValidationError { .. } => ErrorCategory::Input,
            Self::ApiError(_) => ErrorCategory::Network,
            Self::OcrError { .. } | Self::ExtractionError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Extraction
            }
            Self::ZipError(_) | Self::CsvError(_) | Self::XlsxError(_) | Self::RenderError { .. } => {
                ErrorCategory::Rendering
            }
            Self::IoError(_) | Self::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Extraction => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Rendering => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file and command-line flags; see --help for valid values"
            }
            ErrorCategory::Input => {
                "Select existing folders that contain at least one PDF document"
            }
            ErrorCategory::Network => {
                "Verify the extractor endpoint, API key and network connectivity"
            }
            ErrorCategory::Extraction => {
                "Check that ocrmypdf and pdftotext are installed and the document is readable"
            }
            ErrorCategory::Rendering => {
                "Make sure the output folder exists and is writable"
            }
            ErrorCategory::System => "Retry the run; if it keeps failing, check disk space and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InputValidationError { message } => message.clone(),
            Self::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::RenderError { message } => format!("Could not write the report: {}", message),
            other => other.to_string(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InputValidationError {
            message: message.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::ExtractionError {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_high_severity() {
        let err = ReconcileError::input("La carpeta de promesas no contiene archivos PDF.");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(
            err.user_friendly_message(),
            "La carpeta de promesas no contiene archivos PDF."
        );
    }

    #[test]
    fn test_render_errors_are_rendering_category() {
        let err = ReconcileError::render("destination not writable");
        assert_eq!(err.category(), ErrorCategory::Rendering);
        assert!(err.user_friendly_message().contains("destination not writable"));
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ReconcileError::MissingConfigError {
            field: "input.promises_dir".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
