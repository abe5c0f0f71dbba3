mod utils;
#[allow(unused)]
use utils::*;

use loadlab::aggregator::{ResultStore, CSV_FILE};
use loadlab::prelude::*;
use loadlab_core::LoadConfig;
use loadlab_runtime::{LabRuntime, Step, StepStatus};
use std::time::Duration;

fn small_config(base_url: String, output_dir: &std::path::Path) -> SuiteConfig {
    let load = LoadConfig {
        requests: nonzero(20),
        workers: nonzero(4),
        timeout: Duration::from_secs(5),
    };
    SuiteConfig {
        base_url,
        endpoints: vec![
            "/delay/ms/10".to_string(),
            "/delay/ms/20".to_string(),
            "/delay/ms/30".to_string(),
        ],
        stress_endpoint: "/".to_string(),
        normal: load.clone(),
        stress: LoadConfig {
            requests: nonzero(50),
            workers: nonzero(10),
            ..load
        },
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
#[ntest::timeout(60_000)]
async fn full_run_against_mock() {
    let mock = mock().await;
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("results");

    let summary = LabRuntime::new()
        .config(small_config(mock.base_url(), &dir))
        .probe(fixed_probe())
        .run()
        .await
        .unwrap();

    assert!(!summary.any_failed(), "{summary}");
    assert_eq!(summary.passed(), 2);
    // 3 normal load tests and 1 stress test.
    assert_eq!(mock.hits(), 1 + 3 * 20 + 50);

    let store = ResultStore::new(&dir);
    let results = store.load_results().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results.iter().filter(|r| r.kind == TestKind::Stress).count(), 1);
    assert!(results.iter().all(|r| r.error_count == 0));
    assert!(results.iter().any(|r| r.endpoint == "/delay/ms/10"));

    let report = store.load_report().unwrap();
    assert_eq!(report.descriptive.endpoints, 3);
    assert_eq!(report.hypothesis.verdict, Verdict::Confirmed);
    assert!(report.confidence_intervals.mean_latency.is_defined());

    let document = store.load_document().unwrap();
    assert_eq!(document.base_url, mock.base_url());
}

#[tokio::test]
#[ntest::timeout(60_000)]
async fn failing_endpoint_is_reported_not_fatal() {
    let mock = mock().await;
    let tmp = tempfile::tempdir().unwrap();
    let mut config = small_config(mock.base_url(), tmp.path());
    config.endpoints.push("/status/503".to_string());

    let summary = LabRuntime::new()
        .config(config)
        .steps(&[Step::Performance])
        .probe(fixed_probe())
        .run()
        .await
        .unwrap();
    assert_eq!(summary.status_of(Step::Performance), Some(&StepStatus::Passed));

    let document = ResultStore::new(tmp.path()).load_document().unwrap();
    assert_eq!(document.results.no_data.len(), 1);
    assert_eq!(document.results.no_data[0].endpoint, "/status/503");
    assert_eq!(document.results.no_data[0].error_count, 20);
}

#[tokio::test]
#[ntest::timeout(60_000)]
async fn unreachable_service_produces_nothing() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("results");
    let base_url = refused_url().trim_end_matches('/').to_string();

    let summary = LabRuntime::new()
        .config(small_config(base_url, &dir))
        .probe(fixed_probe())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed(), 2);
    assert!(!dir.join(CSV_FILE).exists());
}

#[tokio::test]
#[ntest::timeout(60_000)]
async fn previous_results_are_backed_up() {
    let mock = mock().await;
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("results");
    let config = SuiteConfig {
        backup_previous: true,
        ..small_config(mock.base_url(), &dir)
    };

    for _ in 0..2 {
        let summary = LabRuntime::new()
            .config(config.clone())
            .steps(&[Step::Performance])
            .probe(fixed_probe())
            .run()
            .await
            .unwrap();
        assert!(!summary.any_failed(), "{summary}");
    }

    let backups: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("results_backup_"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(tmp.path().join(&backups[0]).join(CSV_FILE).exists());
}

#[tokio::test]
#[ntest::timeout(60_000)]
async fn analysis_of_saved_results() {
    let mock = mock().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = small_config(mock.base_url(), tmp.path());

    LabRuntime::new()
        .config(config.clone())
        .steps(&[Step::Performance])
        .probe(fixed_probe())
        .run()
        .await
        .unwrap();
    let hits = mock.hits();

    let summary = LabRuntime::new()
        .config(config)
        .steps(&[Step::Analysis])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.passed(), 1);
    // Analysis never touches the service.
    assert_eq!(mock.hits(), hits);
    assert!(tmp.path().join("statistical_report.json").exists());
}
