use crate::TAIL_PERCENTILE;
use std::time::Duration;

/// Linear-interpolation percentile.
///
/// With `N` values sorted ascending, the rank is `k = (N - 1) * p / 100`. The result
/// interpolates between `sorted[floor(k)]` and the next value, weighted by the fractional part
/// of `k`. Returns `None` for empty input. `p` is clamped to `[0, 100]`.
pub fn percentile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(percentile_sorted(&sorted, p))
}

/// Same as [`percentile`] for data already sorted ascending and non-empty.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let p = p.clamp(0., 100.);
    let k = (sorted.len() - 1) as f64 * p / 100.;
    let f = k.floor() as usize;
    let c = k - f as f64;

    if f >= sorted.len() - 1 {
        sorted[sorted.len() - 1]
    } else {
        sorted[f] * (1. - c) + sorted[f + 1] * c
    }
}

/// Successful samples per second of batch wall-clock time.
pub fn throughput(successful: u64, elapsed: Duration) -> f64 {
    if successful == 0 || elapsed.is_zero() {
        0.
    } else {
        successful as f64 / elapsed.as_secs_f64()
    }
}

/// Latency aggregates (ms) of the successful samples in a batch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatencySummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
}

impl LatencySummary {
    /// `None` when there are no latencies, i.e. no sample succeeded.
    pub fn from_latencies(latencies: &[f64]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            mean: statistical::mean(&sorted),
            median: statistical::median(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p95: percentile_sorted(&sorted, TAIL_PERCENTILE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [f64; 7] = [12., 3.5, 40., 7., 7., 19.25, 1.];

    #[test]
    fn bounds_are_min_and_max() {
        for data in [&DATA[..], &[4.2], &[2., 1.]] {
            let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(percentile(data, 0.), Some(min));
            assert_eq!(percentile(data, 100.), Some(max));
        }
    }

    #[test]
    fn order_independent() {
        let mut reversed = DATA;
        reversed.reverse();
        let mut sorted = DATA;
        sorted.sort_by(f64::total_cmp);

        for p in [5., 25., 50., 90., 95., 99.] {
            assert_eq!(percentile(&DATA, p), percentile(&reversed, p));
            assert_eq!(percentile(&DATA, p), percentile(&sorted, p));
        }
    }

    #[test]
    fn interpolates_between_ranks() {
        let data = [1., 2., 3., 4.];
        // Nearest-rank would report 2 for the median and 4 for p95.
        assert_eq!(percentile(&data, 50.), Some(2.5));
        let p95 = percentile(&data, 95.).unwrap();
        assert!((p95 - 3.85).abs() < 1e-12);

        // k = 9 * 0.95 = 8.55 -> 9 * 0.45 + 10 * 0.55
        let ten: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((percentile(&ten, 95.).unwrap() - 9.55).abs() < 1e-12);
    }

    #[test]
    fn exact_rank_has_no_interpolation() {
        let data = [10., 20., 30., 40., 50.];
        assert_eq!(percentile(&data, 25.), Some(20.));
        assert_eq!(percentile(&data, 75.), Some(40.));
    }

    #[test]
    fn last_index_is_returned_directly() {
        let data = [1., 2., f64::INFINITY];
        // Interpolating with the last element would produce NaN.
        assert_eq!(percentile(&data, 100.), Some(f64::INFINITY));
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(percentile(&[], 50.), None);
        assert_eq!(LatencySummary::from_latencies(&[]), None);
    }

    #[test]
    fn throughput_uses_wall_clock() {
        assert_eq!(throughput(100, Duration::from_secs(2)), 50.);
        assert_eq!(throughput(0, Duration::from_secs(2)), 0.);
        assert_eq!(throughput(10, Duration::ZERO), 0.);
    }

    #[test]
    fn summary_of_uniform_latencies() {
        let summary = LatencySummary::from_latencies(&[50.; 100]).unwrap();
        assert_eq!(summary.mean, 50.);
        assert_eq!(summary.median, 50.);
        assert_eq!(summary.p95, 50.);
        assert_eq!(summary.min, 50.);
        assert_eq!(summary.max, 50.);
    }

    #[test]
    fn summary_of_mixed_latencies() {
        let summary = LatencySummary::from_latencies(&[30., 10., 20., 40.]).unwrap();
        assert_eq!(summary.mean, 25.);
        assert_eq!(summary.median, 25.);
        assert_eq!(summary.min, 10.);
        assert_eq!(summary.max, 40.);
        assert!((summary.p95 - 38.5).abs() < 1e-12);
    }
}
