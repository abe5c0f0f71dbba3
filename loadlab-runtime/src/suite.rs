use crate::RuntimeError;
use loadlab::aggregator::{ResultSet, ResultStore};
use loadlab::evaluator::{Evaluator, StatisticalReport};
use loadlab::load_test::LoadTest;
use loadlab::probe::{ResourceProbe, SystemProbe};
use loadlab::sampler::HttpSampler;
use loadlab_core::{LoadConfig, RequestMethod, SuiteConfig, TestKind};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Performance,
    Analysis,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Performance => write!(f, "performance lab"),
            Step::Analysis => write!(f, "statistical analysis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed(String),
    /// Not run because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub elapsed: Duration,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            StepStatus::Passed => write!(
                f,
                "[PASSED] {} ({})",
                self.step,
                humantime::format_duration(round_millis(self.elapsed))
            ),
            StepStatus::Failed(reason) => write!(f, "[FAILED] {}: {reason}", self.step),
            StepStatus::Skipped => write!(f, "[SKIPPED] {}", self.step),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteSummary {
    pub steps: Vec<StepRecord>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.count(|s| *s == StepStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == StepStatus::Skipped)
    }

    pub fn any_failed(&self) -> bool {
        self.failed() > 0
    }

    pub fn status_of(&self, step: Step) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.status)
    }

    fn count(&self, pred: impl Fn(&StepStatus) -> bool) -> usize {
        self.steps.iter().filter(|r| pred(&r.status)).count()
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.steps {
            writeln!(f, "{record}")?;
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

/// Runs lab steps against one service.
pub struct Suite {
    config: SuiteConfig,
    sampler: HttpSampler,
    probe: Arc<dyn ResourceProbe>,
    store: ResultStore,
}

impl Suite {
    pub fn new(config: SuiteConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let sampler = HttpSampler::new(config.normal.timeout)?;
        let probe: Arc<dyn ResourceProbe> = Arc::new(SystemProbe::new(config.probe_interval));
        let store = ResultStore::new(&config.output_dir);

        Ok(Self {
            config,
            sampler,
            probe,
            store,
        })
    }

    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Runs `steps` in order.
    ///
    /// A failed step is recorded and the next one still runs, unless the suite is configured to
    /// stop on the first failure. Steps after that are skipped.
    pub async fn run(&self, steps: &[Step]) -> SuiteSummary {
        let mut summary = SuiteSummary::default();
        let mut halted = false;

        for &step in steps {
            if halted {
                warn!("Skipping {step}.");
                summary.steps.push(StepRecord {
                    step,
                    status: StepStatus::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            info!("Running {step}.");
            let start = Instant::now();
            let status = match self.run_step(step).await {
                Ok(()) => StepStatus::Passed,
                Err(err) => {
                    error!("{step} failed: {err}");
                    halted = self.config.stop_on_first_failure;
                    StepStatus::Failed(err.to_string())
                }
            };

            let record = StepRecord {
                step,
                status,
                elapsed: start.elapsed(),
            };
            info!("{record}");
            summary.steps.push(record);
        }

        summary
    }

    async fn run_step(&self, step: Step) -> Result<(), RuntimeError> {
        match step {
            Step::Performance => self.performance().await.map(|_| ()),
            Step::Analysis => self.analysis().map(|_| ()),
        }
    }

    /// Load tests every configured endpoint, stress tests the stress endpoint and persists the
    /// results.
    ///
    /// Nothing is sent or written when the service is unreachable.
    #[instrument(name = "performance", skip_all, fields(base_url = %self.config.base_url))]
    pub async fn performance(&self) -> Result<ResultSet, RuntimeError> {
        self.sampler
            .check_connectivity(&self.config.base_url)
            .await?;
        info!("Service reachable at {}", self.config.base_url);

        if self.config.backup_previous {
            self.store.backup()?;
        }

        let mut results = ResultSet::new();
        for endpoint in &self.config.endpoints {
            let outcome = self
                .load_test(endpoint, TestKind::Normal, &self.config.normal)
                .await;
            results.push(endpoint, TestKind::Normal, outcome);
        }

        let endpoint = &self.config.stress_endpoint;
        let outcome = self
            .load_test(endpoint, TestKind::Stress, &self.config.stress)
            .await;
        results.push(endpoint, TestKind::Stress, outcome);

        for record in &results.no_data {
            warn!(
                "No successful requests for {} [{}]: {} errors",
                record.endpoint, record.kind, record.error_count
            );
        }

        self.store.persist(&results, &self.config.base_url)?;
        Ok(results)
    }

    async fn load_test(
        &self,
        endpoint: &str,
        kind: TestKind,
        config: &LoadConfig,
    ) -> loadlab_core::LoadOutcome {
        let url = self.config.url_for(endpoint);
        let sampler = self.sampler.with_timeout(config.timeout);

        LoadTest::http(&sampler, &url, RequestMethod::Get)
            .endpoint(endpoint)
            .config(config)
            .kind(kind)
            .probe(self.probe.clone())
            .await
    }

    /// Evaluates the persisted results and persists the report.
    #[instrument(name = "analysis", skip_all)]
    pub fn analysis(&self) -> Result<StatisticalReport, RuntimeError> {
        let results = self.store.load_results()?;
        if results.is_empty() {
            return Err(RuntimeError::NoResults(self.store.csv_path()));
        }

        let evaluator = Evaluator::new(self.config.hypothesis.clone())?;
        let report = evaluator.evaluate(&results);
        self.store.persist_report(&report)?;

        let hypothesis = &report.hypothesis;
        if let Some(mean) = hypothesis.observed_mean_ms {
            info!("Observed mean latency: {mean:.2}ms");
        }
        for comparison in &hypothesis.comparisons {
            match comparison.improvement {
                Some(improvement) => info!(
                    "Improvement vs {}ms: {:.1}%",
                    comparison.baseline_ms,
                    improvement * 100.
                ),
                None => info!("Improvement vs {}ms: undefined", comparison.baseline_ms),
            }
        }
        info!(
            "Hypothesis {}; statistically significant at alpha={}: {}",
            hypothesis.verdict, hypothesis.alpha, hypothesis.significant
        );

        Ok(report)
    }
}

fn round_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}
