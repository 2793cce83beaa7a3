use thiserror::Error;

/// Errors surfaced by the load test library.
///
/// Scenario parameters never produce errors (they fall back to defaults) and
/// neither do failed requests (they become failed checks). What is left is
/// setup and reporting.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Config file not found: {}", .0.display())]
    ConfigFileNotFound(std::path::PathBuf),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] hdrhistogram::CreationError),

    #[error("Summary export failed: {0}")]
    Export(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<figment::Error> for LoadTestError {
    fn from(err: figment::Error) -> Self {
        LoadTestError::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LoadTestError>;
