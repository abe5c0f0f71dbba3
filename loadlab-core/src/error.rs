use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("At least one baseline is required for hypothesis evaluation")]
    NoBaselines,

    #[error("Baseline must be a positive latency in ms, got {0}")]
    InvalidBaseline(f64),

    #[error("Confidence level must be within (0, 1), got {0}")]
    InvalidConfidence(f64),

    #[error("Significance level must be within (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("Expected improvement range is invalid: min={min}, max={max}")]
    InvalidImprovement { min: f64, max: f64 },

    #[error("No endpoints configured")]
    NoEndpoints,

    #[error("Base URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}
