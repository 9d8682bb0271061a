use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or reporting a load-test run.
///
/// Failures of the system under test are never errors: they are recorded as
/// failed checks and failed requests instead.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid duration for {key} '{value}': {source}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidOption { key: &'static str, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("latency histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("failed to write summary to {}: {source}", path.display())]
    SummaryExport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoadTestError>;
