//! Command line runtime
//!
//! Builds a [`SuiteConfig`] from defaults, an optional JSON config file and command line flags
//! (in that order of precedence), then runs the selected steps.
use crate::{RuntimeError, Step, Suite, SuiteSummary};
use clap::{Parser, Subcommand};
use loadlab::probe::ResourceProbe;
use loadlab_core::SuiteConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "loadlab=info,loadlab_runtime=info";

#[derive(Parser, Debug)]
#[command(version, about = "Concurrent load testing and statistical evaluation of an HTTP service")]
struct LabCli {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON file with a suite configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the service under test
    #[arg(short('u'), long, global = true)]
    base_url: Option<String>,

    /// Endpoint path to load test; repeat for several endpoints
    #[arg(short, long = "endpoint", global = true)]
    endpoints: Vec<String>,

    /// Directory results are written to and read from
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Per-request timeout, e.g. `30s` or `500ms`
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Skip the remaining steps once one fails
    #[arg(long, global = true)]
    stop_on_first_failure: bool,

    /// Back up an existing results directory before overwriting it
    #[arg(long, global = true)]
    backup: bool,
}

#[derive(Subcommand, Debug, Copy, Clone, PartialEq, Eq)]
enum Command {
    /// Performance lab followed by statistical analysis (default)
    Run,
    /// Performance lab only
    Load,
    /// Statistical analysis of previously saved results
    Analyze,
}

impl Command {
    fn steps(self) -> Vec<Step> {
        match self {
            Command::Run => vec![Step::Performance, Step::Analysis],
            Command::Load => vec![Step::Performance],
            Command::Analyze => vec![Step::Analysis],
        }
    }
}

/// Lab runtime.
///
/// # Example
///
/// ```no_run
/// use loadlab_runtime::LabRuntime;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let summary = LabRuntime::new().with_args()?.run().await?;
///     println!("{summary}");
///     Ok(())
/// }
/// ```
pub struct LabRuntime {
    config: SuiteConfig,
    steps: Vec<Step>,
    probe: Option<Arc<dyn ResourceProbe>>,
}

impl Default for LabRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl LabRuntime {
    pub fn new() -> Self {
        Self {
            config: SuiteConfig::default(),
            steps: Command::Run.steps(),
            probe: None,
        }
    }

    /// Use the command line arguments of the `loadlab` binary.
    ///
    /// `loadlab [run|load|analyze]` selects the steps; see `loadlab --help` for the flags.
    pub fn with_args(self) -> Result<Self, RuntimeError> {
        self.apply(LabCli::parse())
    }

    fn apply(mut self, cli: LabCli) -> Result<Self, RuntimeError> {
        if let Some(path) = &cli.config {
            self.config = load_config(path)?;
        }
        if let Some(base_url) = cli.base_url {
            self.config.base_url = base_url;
        }
        if !cli.endpoints.is_empty() {
            self.config.endpoints = cli.endpoints;
        }
        if let Some(output) = cli.output {
            self.config.output_dir = output;
        }
        if let Some(timeout) = cli.timeout {
            self.config.normal.timeout = timeout;
            self.config.stress.timeout = timeout;
        }
        self.config.stop_on_first_failure |= cli.stop_on_first_failure;
        self.config.backup_previous |= cli.backup;

        self.steps = cli.command.unwrap_or(Command::Run).steps();
        Ok(self)
    }

    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn steps(mut self, steps: &[Step]) -> Self {
        self.steps = steps.to_vec();
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Fails only when the configuration is invalid; step failures are in the summary.
    #[instrument(name = "loadlab", skip_all, fields(base_url = %self.config.base_url))]
    pub async fn run(self) -> Result<SuiteSummary, RuntimeError> {
        let mut suite = Suite::new(self.config)?;
        if let Some(probe) = self.probe {
            suite = suite.with_probe(probe);
        }

        let summary = suite.run(&self.steps).await;
        info!(
            "Suite finished: {} passed, {} failed, {} skipped",
            summary.passed(),
            summary.failed(),
            summary.skipped()
        );
        Ok(summary)
    }
}

pub fn load_config(path: &Path) -> Result<SuiteConfig, RuntimeError> {
    let file = File::open(path).map_err(|source| RuntimeError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_reader(BufReader::new(file))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}
