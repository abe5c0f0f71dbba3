use loadlab_core::{BatchTally, SampleResult};
use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Shared, lock-free state of a running batch.
///
/// Workers claim tickets until `requests` have been handed out and record each sample as it
/// completes. Nothing here is held across a request.
pub(crate) struct BatchAtomics {
    requests: usize,
    dispatched: AtomicUsize,
    success: AtomicU64,
    error: AtomicU64,
    latency: AtomicBucket<f64>,
}

impl BatchAtomics {
    pub fn new(requests: usize) -> Self {
        Self {
            requests,
            dispatched: AtomicUsize::new(0),
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
            latency: AtomicBucket::new(),
        }
    }

    /// Returns `false` once every request of the batch has been claimed.
    pub fn claim(&self) -> bool {
        self.dispatched.fetch_add(1, Ordering::Relaxed) < self.requests
    }

    pub fn record(&self, sample: &SampleResult) {
        if sample.is_success() {
            self.latency.push(sample.elapsed_ms);
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drains the collected latencies. Call after every worker has been joined.
    pub fn collect(&self, elapsed: Duration) -> (BatchTally, Vec<f64>) {
        let successful = self.success.swap(0, Ordering::Relaxed);
        let mut errors = self.error.swap(0, Ordering::Relaxed);
        let total_requests = self.requests as u64;

        // Claimed tickets whose worker died never got recorded.
        let lost = total_requests.saturating_sub(successful + errors);
        if lost > 0 {
            warn!("{lost} samples were lost to failed workers; counting them as errors.");
            errors += lost;
        }

        let mut latencies = Vec::with_capacity(successful as usize);
        self.latency
            .clear_with(|chunk| latencies.extend_from_slice(chunk));

        let tally = BatchTally {
            total_requests,
            successful,
            errors,
            elapsed,
        };

        (tally, latencies)
    }
}
