mod utils;
#[allow(unused)]
use utils::*;

use loadlab::core::SampleFailure;
use loadlab::prelude::*;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn uniform_delay_endpoint() {
    let mock = mock().await;
    let sampler = HttpSampler::new(Duration::from_secs(5)).unwrap();

    let outcome = LoadTest::http(&sampler, &mock.url("/delay/ms/50"), RequestMethod::Get)
        .requests(nonzero(100))
        .workers(nonzero(10))
        .probe(fixed_probe())
        .await;

    let result = outcome.into_result().expect("every request should succeed");
    assert_eq!(result.total_requests, 100);
    assert_eq!(result.successful_requests, 100);
    assert_eq!(result.error_count, 0);
    assert!(result.min_ms >= 50.);
    assert!(result.mean_ms >= 50. && result.mean_ms < 500.);
    assert!(result.p95_ms >= result.median_ms && result.p95_ms <= result.max_ms);
    assert_eq!(result.resources.cpu_percent, 25.);

    // 10 rounds of at least 50ms each.
    assert!(result.duration_secs >= 0.5);
    let expected = 100. / result.duration_secs;
    assert!((result.throughput - expected).abs() / expected < 1e-9);
    assert_eq!(mock.hits(), 100);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn jittered_endpoint_spreads_latencies() {
    let mock = mock().await;
    let sampler = HttpSampler::new(Duration::from_secs(5)).unwrap();

    let outcome = LoadTest::http(&sampler, &mock.url("/jitter/ms/40/15"), RequestMethod::Get)
        .requests(nonzero(60))
        .workers(nonzero(20))
        .probe(fixed_probe())
        .await;

    let result = outcome.into_result().expect("every request should succeed");
    assert_eq!(result.successful_requests, 60);
    assert!(result.min_ms <= result.median_ms);
    assert!(result.median_ms <= result.p95_ms);
    assert!(result.p95_ms <= result.max_ms);
    assert!(result.max_ms > result.min_ms);
    assert_eq!(mock.hits(), 60);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn refused_connections_are_no_data() {
    init();
    let sampler = HttpSampler::new(Duration::from_secs(5)).unwrap();

    let outcome = run_load(&sampler, &refused_url(), nonzero(50), nonzero(10)).await;

    match outcome {
        LoadOutcome::NoData(tally) => {
            assert_eq!(tally.errors, 50);
            assert_eq!(tally.successful, 0);
        }
        LoadOutcome::Measured(result) => panic!("unexpected result {result}"),
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn server_errors_are_counted() {
    let mock = mock().await;
    let sampler = HttpSampler::default();

    let outcome = LoadTest::http(&sampler, &mock.url("/status/500"), RequestMethod::Get)
        .requests(nonzero(20))
        .workers(nonzero(5))
        .probe(fixed_probe())
        .await;
    assert_eq!(outcome.error_count(), 20);
    assert!(outcome.result().is_none());

    let outcome = LoadTest::http(&sampler, &mock.url("/flaky/4"), RequestMethod::Get)
        .requests(nonzero(40))
        .workers(nonzero(4))
        .probe(fixed_probe())
        .await;
    let result = outcome.into_result().unwrap();
    // The mock counts hits over every route: 20 earlier requests, then every 4th of 21..=60.
    assert_eq!(result.error_count, 10);
    assert_eq!(result.successful_requests, 30);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn slow_responses_time_out() {
    let mock = mock().await;
    let sampler = HttpSampler::new(Duration::from_millis(50)).unwrap();

    let sample = sampler
        .sample(&mock.url("/delay/ms/1000"), RequestMethod::Get)
        .await;
    assert_eq!(sample.error(), Some(&SampleFailure::Timeout));
    assert_eq!(sample.elapsed_ms, 0.);

    let sample = sampler
        .with_timeout(Duration::from_secs(5))
        .sample(&mock.url("/delay/ms/10"), RequestMethod::Get)
        .await;
    assert!(sample.is_success());
    assert!(sample.elapsed_ms >= 10.);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn form_posts() {
    let mock = mock().await;
    let sampler = HttpSampler::default();

    let sample = sampler
        .sample_form(&mock.url("/echo"), &[("nombre", "Ana"), ("email", "ana@example.com")])
        .await;
    assert!(sample.is_success());
    assert_eq!(sample.method, RequestMethod::Post);
    assert_eq!(sample.status_code, 200);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn connectivity() {
    let mock = mock().await;
    let sampler = HttpSampler::default();

    sampler.check_connectivity(&mock.base_url()).await.unwrap();

    let err = sampler
        .check_connectivity(&mock.url("/status/503"))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Service unavailable"));

    let err = sampler.check_connectivity(&refused_url()).await.unwrap_err();
    assert!(matches!(err, LabError::Connectivity { .. }));
}
