use loadlab_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    /// The target could not be reached before a load test started.
    #[error("Service unavailable at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
