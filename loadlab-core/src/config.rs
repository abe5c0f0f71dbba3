use crate::{
    ConfigError, TestKind, DEFAULT_ALPHA, DEFAULT_BASELINES_MS, DEFAULT_CONFIDENCE,
    DEFAULT_MAX_IMPROVEMENT, DEFAULT_MIN_IMPROVEMENT, DEFAULT_PROBE_INTERVAL, DEFAULT_REQUESTS,
    DEFAULT_SAMPLE_TIMEOUT, DEFAULT_WORKERS, STRESS_REQUESTS, STRESS_WORKERS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Shape of a single load test batch.
///
/// Fields missing from a config file take the `normal` defaults.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub requests: NonZeroUsize,
    pub workers: NonZeroUsize,
    #[serde_as(as = "DurationSeconds")]
    pub timeout: Duration,
}

impl LoadConfig {
    pub fn normal() -> Self {
        Self {
            requests: DEFAULT_REQUESTS,
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_SAMPLE_TIMEOUT,
        }
    }

    pub fn stress() -> Self {
        Self {
            requests: STRESS_REQUESTS,
            workers: STRESS_WORKERS,
            timeout: DEFAULT_SAMPLE_TIMEOUT,
        }
    }

    pub fn for_kind(kind: TestKind) -> Self {
        match kind {
            TestKind::Normal => Self::normal(),
            TestKind::Stress => Self::stress(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::normal()
    }
}

/// Experiment parameters for the statistical evaluator.
///
/// The baselines and improvement thresholds describe the experiment, not the engine, so they
/// are always supplied from the outside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisConfig {
    pub baselines_ms: Vec<f64>,
    pub min_improvement: f64,
    pub max_improvement: f64,
    pub confidence: f64,
    pub alpha: f64,
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            baselines_ms: DEFAULT_BASELINES_MS.to_vec(),
            min_improvement: DEFAULT_MIN_IMPROVEMENT,
            max_improvement: DEFAULT_MAX_IMPROVEMENT,
            confidence: DEFAULT_CONFIDENCE,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl HypothesisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baselines_ms.is_empty() {
            return Err(ConfigError::NoBaselines);
        }

        if let Some(bad) = self
            .baselines_ms
            .iter()
            .find(|b| !b.is_finite() || **b <= 0.)
        {
            return Err(ConfigError::InvalidBaseline(*bad));
        }

        if !(self.confidence > 0. && self.confidence < 1.) {
            return Err(ConfigError::InvalidConfidence(self.confidence));
        }

        if !(self.alpha > 0. && self.alpha < 1.) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }

        if !(self.min_improvement.is_finite()
            && self.max_improvement.is_finite()
            && self.min_improvement <= self.max_improvement)
        {
            return Err(ConfigError::InvalidImprovement {
                min: self.min_improvement,
                max: self.max_improvement,
            });
        }

        Ok(())
    }
}

/// Full configuration of a lab run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub base_url: String,
    pub endpoints: Vec<String>,
    /// Endpoint hit by the stress test.
    pub stress_endpoint: String,
    pub normal: LoadConfig,
    pub stress: LoadConfig,
    pub hypothesis: HypothesisConfig,
    pub output_dir: PathBuf,
    #[serde_as(as = "DurationSeconds")]
    pub probe_interval: Duration,
    pub stop_on_first_failure: bool,
    pub backup_previous: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            endpoints: ["/", "/clientes/", "/vehiculos/", "/ordenes/", "/accounts/"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            stress_endpoint: "/".to_string(),
            normal: LoadConfig::normal(),
            stress: LoadConfig::stress(),
            hypothesis: HypothesisConfig::default(),
            output_dir: PathBuf::from("results"),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            stop_on_first_failure: false,
            backup_previous: false,
        }
    }
}

impl SuiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        self.hypothesis.validate()
    }

    /// Joins an endpoint path onto the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
