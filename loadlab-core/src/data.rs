use crate::stats::LatencySummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Normal,
    Stress,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Normal => write!(f, "normal"),
            TestKind::Stress => write!(f, "stress"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "GET"),
            RequestMethod::Post => write!(f, "POST"),
        }
    }
}

/// Why a single sample did not count as a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFailure {
    Timeout,
    Connect(String),
    /// The service answered with a non-2xx status.
    Status(u16),
    Request(String),
}

impl fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFailure::Timeout => write!(f, "request timed out"),
            SampleFailure::Connect(err) => write!(f, "connection failed: {err}"),
            SampleFailure::Status(code) => write!(f, "unexpected HTTP status {code}"),
            SampleFailure::Request(err) => write!(f, "request failed: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Success,
    Failure(SampleFailure),
}

/// A single timed request.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub endpoint: String,
    pub method: RequestMethod,
    pub elapsed_ms: f64,
    pub status_code: u16,
    pub timestamp: OffsetDateTime,
    pub outcome: SampleOutcome,
}

impl SampleResult {
    pub fn success(endpoint: &str, method: RequestMethod, elapsed: Duration, status: u16) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.,
            status_code: status,
            timestamp: OffsetDateTime::now_utc(),
            outcome: SampleOutcome::Success,
        }
    }

    /// Failed samples never carry timing or status data.
    pub fn failure(endpoint: &str, method: RequestMethod, failure: SampleFailure) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method,
            elapsed_ms: 0.,
            status_code: 0,
            timestamp: OffsetDateTime::now_utc(),
            outcome: SampleOutcome::Failure(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SampleOutcome::Success)
    }

    pub fn error(&self) -> Option<&SampleFailure> {
        match &self.outcome {
            SampleOutcome::Success => None,
            SampleOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Host utilization at the moment a load test finished.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available_bytes: u64,
    pub disk_percent: f64,
}

/// Counters of a finished batch, independent of whether any sample succeeded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BatchTally {
    pub total_requests: u64,
    pub successful: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

impl BatchTally {
    pub fn throughput(&self) -> f64 {
        crate::stats::throughput(self.successful, self.elapsed)
    }
}

/// Aggregate metrics of one load test against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTestResult {
    pub endpoint: String,
    pub kind: TestKind,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub throughput: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub error_count: u64,
    pub duration_secs: f64,
    pub resources: ResourceSnapshot,
}

impl LoadTestResult {
    pub fn new(
        endpoint: &str,
        kind: TestKind,
        latency: LatencySummary,
        tally: BatchTally,
        resources: ResourceSnapshot,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            kind,
            mean_ms: latency.mean,
            median_ms: latency.median,
            min_ms: latency.min,
            max_ms: latency.max,
            p95_ms: latency.p95,
            throughput: tally.throughput(),
            total_requests: tally.total_requests,
            successful_requests: tally.successful,
            error_count: tally.errors,
            duration_secs: tally.elapsed.as_secs_f64(),
            resources,
        }
    }
}

impl fmt::Display for LoadTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: mean={:.2}ms, p95={:.2}ms, throughput={:.2} req/s, errors={}/{}",
            self.endpoint,
            self.kind,
            self.mean_ms,
            self.p95_ms,
            self.throughput,
            self.error_count,
            self.total_requests,
        )
    }
}

/// Result of a load test batch.
///
/// A batch in which every sample failed is a valid outcome rather than an error; its tally
/// is still available for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Measured(LoadTestResult),
    NoData(BatchTally),
}

impl LoadOutcome {
    pub fn result(&self) -> Option<&LoadTestResult> {
        match self {
            LoadOutcome::Measured(result) => Some(result),
            LoadOutcome::NoData(_) => None,
        }
    }

    pub fn into_result(self) -> Option<LoadTestResult> {
        match self {
            LoadOutcome::Measured(result) => Some(result),
            LoadOutcome::NoData(_) => None,
        }
    }

    pub fn error_count(&self) -> u64 {
        match self {
            LoadOutcome::Measured(result) => result.error_count,
            LoadOutcome::NoData(tally) => tally.errors,
        }
    }
}
