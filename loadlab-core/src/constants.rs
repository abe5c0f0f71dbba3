use std::num::NonZeroUsize;
use std::time::Duration;

/// Requests issued against each endpoint during a normal load test.
pub const DEFAULT_REQUESTS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(100) };

/// Concurrent workers used during a normal load test.
pub const DEFAULT_WORKERS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(10) };

/// Requests issued during the stress test.
pub const STRESS_REQUESTS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(500) };

/// Concurrent workers used during the stress test.
pub const STRESS_WORKERS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(50) };

/// Per-request timeout enforced by the sampler.
pub const DEFAULT_SAMPLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout of the single request used to check that the target is reachable.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sampling window of the CPU measurement in the resource probe.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Percentile reported as the tail latency of a load test.
pub const TAIL_PERCENTILE: f64 = 95.;

pub const DEFAULT_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Latency bounds (ms) the observed mean latency is compared against.
pub const DEFAULT_BASELINES_MS: [f64; 2] = [150., 200.];

/// Minimum improvement over every baseline for a hypothesis to be confirmed.
pub const DEFAULT_MIN_IMPROVEMENT: f64 = 0.25;

/// Upper end of the expected improvement range. Informational only.
pub const DEFAULT_MAX_IMPROVEMENT: f64 = 0.45;
