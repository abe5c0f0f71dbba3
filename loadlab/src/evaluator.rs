//! Statistical evaluation of load test results
//!
//! Every statistic is computed over one datum per endpoint (the endpoint's mean latency, p95 or
//! throughput from its `normal` load test), not over raw request samples. With a handful of
//! endpoints the confidence intervals are wide and the shape statistics are weak; read them as
//! indicative.
mod distribution;

pub use distribution::Degenerate;

use distribution::{one_sample_t_test, population_std_dev, sample_std_dev, t_critical, Moments};
use loadlab_core::{percentile, ConfigError, HypothesisConfig, LoadTestResult, TestKind};
use serde::{Deserialize, Serialize};
use std::fmt;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalReport {
    pub descriptive: Descriptive,
    pub shape: DistributionShape,
    pub hypothesis: HypothesisOutcome,
    pub confidence_intervals: ConfidenceIntervals,
}

/// Location and spread of the per-endpoint mean latencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    pub endpoints: usize,
    pub mean_latency_ms: Option<f64>,
    /// Median of the per-endpoint mean latencies.
    pub median_latency_ms: Option<f64>,
    pub mean_throughput: Option<f64>,
    pub mean_p95_ms: Option<f64>,
    pub population_std_dev: Option<f64>,
    pub sample_std_dev: Option<f64>,
    /// Sample standard deviation over the mean.
    pub coefficient_of_variation: Option<f64>,
    pub interquartile_range: Option<f64>,
    /// Set when any of the spread statistics above is missing.
    pub undefined_reason: Option<Degenerate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionShape {
    /// Biased sample skewness.
    pub skewness: Option<f64>,
    /// Biased excess kurtosis.
    pub kurtosis: Option<f64>,
    pub undefined_reason: Option<Degenerate>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Confirmed,
    Rejected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Confirmed => write!(f, "confirmed"),
            Verdict::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub baseline_ms: f64,
    /// `(baseline - observed) / baseline`
    pub improvement: Option<f64>,
    pub meets_threshold: bool,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub undefined_reason: Option<Degenerate>,
}

/// Observed mean latency against the configured baselines.
///
/// The verdict depends only on the effect size. Significance is reported next to it and never
/// changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisOutcome {
    pub observed_mean_ms: Option<f64>,
    pub min_improvement: f64,
    pub max_improvement: f64,
    pub comparisons: Vec<BaselineComparison>,
    pub verdict: Verdict,
    /// Every baseline rejected at `alpha`.
    pub significant: bool,
    pub alpha: f64,
    /// Every improvement lies within `[min_improvement, max_improvement]`.
    pub within_expected_range: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfidenceInterval {
    Defined {
        n: usize,
        mean: f64,
        lower: f64,
        upper: f64,
        margin: f64,
    },
    Undefined {
        n: usize,
        mean: Option<f64>,
        reason: Degenerate,
    },
}

impl ConfidenceInterval {
    /// `mean ± stderr * t(n - 1, (1 + confidence) / 2)`
    pub fn new(data: &[f64], confidence: f64) -> Self {
        let n = data.len();
        let sd = match sample_std_dev(data) {
            Ok(sd) => sd,
            Err(reason) => {
                return ConfidenceInterval::Undefined {
                    n,
                    mean: (n > 0).then(|| statistical::mean(data)),
                    reason,
                }
            }
        };

        let mean = statistical::mean(data);
        let Some(t) = t_critical(n - 1, confidence) else {
            return ConfidenceInterval::Undefined {
                n,
                mean: Some(mean),
                reason: Degenerate::SingleSample,
            };
        };
        let margin = sd / (n as f64).sqrt() * t;

        ConfidenceInterval::Defined {
            n,
            mean,
            lower: mean - margin,
            upper: mean + margin,
            margin,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, ConfidenceInterval::Defined { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub confidence: f64,
    pub mean_latency: ConfidenceInterval,
    pub throughput: ConfidenceInterval,
    pub p95: ConfidenceInterval,
}

/// Evaluates load test results against a validated [`HypothesisConfig`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: HypothesisConfig,
}

impl Evaluator {
    pub fn new(config: HypothesisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HypothesisConfig {
        &self.config
    }

    /// Only `normal` results are evaluated; stress runs are ignored.
    #[instrument(name = "evaluate", skip_all, fields(results = results.len()))]
    pub fn evaluate(&self, results: &[LoadTestResult]) -> StatisticalReport {
        let normal: Vec<&LoadTestResult> = results
            .iter()
            .filter(|r| r.kind == TestKind::Normal)
            .collect();
        debug!(
            "Evaluating {} endpoint means ({} stress results skipped)",
            normal.len(),
            results.len() - normal.len()
        );

        let means: Vec<f64> = normal.iter().map(|r| r.mean_ms).collect();
        let throughputs: Vec<f64> = normal.iter().map(|r| r.throughput).collect();
        let p95s: Vec<f64> = normal.iter().map(|r| r.p95_ms).collect();

        let report = StatisticalReport {
            descriptive: descriptive(&means, &throughputs, &p95s),
            shape: shape(&means),
            hypothesis: self.hypothesis(&means),
            confidence_intervals: ConfidenceIntervals {
                confidence: self.config.confidence,
                mean_latency: ConfidenceInterval::new(&means, self.config.confidence),
                throughput: ConfidenceInterval::new(&throughputs, self.config.confidence),
                p95: ConfidenceInterval::new(&p95s, self.config.confidence),
            },
        };

        info!(
            "Hypothesis {} (statistically significant: {})",
            report.hypothesis.verdict, report.hypothesis.significant
        );

        report
    }

    fn hypothesis(&self, means: &[f64]) -> HypothesisOutcome {
        let config = &self.config;
        let observed = mean_of(means);

        let comparisons: Vec<BaselineComparison> = config
            .baselines_ms
            .iter()
            .map(|&baseline_ms| {
                let improvement = observed.map(|mean| (baseline_ms - mean) / baseline_ms);
                let (t_statistic, p_value, undefined_reason) =
                    match one_sample_t_test(means, baseline_ms) {
                        Ok(test) => (Some(test.statistic), Some(test.p_value), None),
                        Err(reason) => (None, None, Some(reason)),
                    };

                BaselineComparison {
                    baseline_ms,
                    improvement,
                    meets_threshold: improvement.is_some_and(|i| i >= config.min_improvement),
                    t_statistic,
                    p_value,
                    undefined_reason,
                }
            })
            .collect();

        let verdict = if comparisons.iter().all(|c| c.meets_threshold) {
            Verdict::Confirmed
        } else {
            Verdict::Rejected
        };

        let significant = comparisons
            .iter()
            .all(|c| c.p_value.is_some_and(|p| p < config.alpha));

        let within_expected_range = comparisons.iter().all(|c| {
            c.improvement
                .is_some_and(|i| i >= config.min_improvement && i <= config.max_improvement)
        });

        HypothesisOutcome {
            observed_mean_ms: observed,
            min_improvement: config.min_improvement,
            max_improvement: config.max_improvement,
            comparisons,
            verdict,
            significant,
            alpha: config.alpha,
            within_expected_range,
        }
    }
}

/// Validates `config` and evaluates `results` with it.
pub fn evaluate(
    results: &[LoadTestResult],
    config: &HypothesisConfig,
) -> Result<StatisticalReport, ConfigError> {
    Ok(Evaluator::new(config.clone())?.evaluate(results))
}

fn mean_of(data: &[f64]) -> Option<f64> {
    (!data.is_empty()).then(|| statistical::mean(data))
}

fn descriptive(means: &[f64], throughputs: &[f64], p95s: &[f64]) -> Descriptive {
    let sample_sd = sample_std_dev(means);
    let mean = mean_of(means);

    let cv = match (sample_sd, mean) {
        (Ok(sd), Some(mean)) if mean != 0. => Ok(sd / mean),
        (Ok(_), _) => Err(Degenerate::ZeroMean),
        (Err(reason), _) => Err(reason),
    };

    let iqr = match (percentile(means, 75.), percentile(means, 25.)) {
        (Some(q3), Some(q1)) => Some(q3 - q1),
        _ => None,
    };

    Descriptive {
        endpoints: means.len(),
        mean_latency_ms: mean,
        median_latency_ms: (!means.is_empty()).then(|| statistical::median(means)),
        mean_throughput: mean_of(throughputs),
        mean_p95_ms: mean_of(p95s),
        population_std_dev: population_std_dev(means).ok(),
        sample_std_dev: sample_sd.ok(),
        coefficient_of_variation: cv.ok(),
        interquartile_range: iqr,
        undefined_reason: cv.err(),
    }
}

fn shape(means: &[f64]) -> DistributionShape {
    let moments = Moments::new(means);
    let skewness = moments.and_then(|m| m.skewness());
    let kurtosis = moments.and_then(|m| m.kurtosis());

    DistributionShape {
        skewness: skewness.ok(),
        kurtosis: kurtosis.ok(),
        undefined_reason: skewness.err(),
    }
}
