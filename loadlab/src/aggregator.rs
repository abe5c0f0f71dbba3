//! Collection and persistence of load test results
use crate::evaluator::StatisticalReport;
use crate::LabError;
use loadlab_core::{LoadOutcome, LoadTestResult, ResourceSnapshot, TestKind};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const CSV_FILE: &str = "load_results.csv";
pub const JSON_FILE: &str = "load_results.json";
pub const REPORT_FILE: &str = "statistical_report.json";

/// A load test in which no sample succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataRecord {
    pub endpoint: String,
    pub kind: TestKind,
    pub total_requests: u64,
    pub error_count: u64,
    pub duration_secs: f64,
}

/// Results of a suite run, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub load_tests: Vec<LoadTestResult>,
    pub no_data: Vec<NoDataRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, endpoint: &str, kind: TestKind, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Measured(result) => self.load_tests.push(result),
            LoadOutcome::NoData(tally) => self.no_data.push(NoDataRecord {
                endpoint: endpoint.to_string(),
                kind,
                total_requests: tally.total_requests,
                error_count: tally.errors,
                duration_secs: tally.elapsed.as_secs_f64(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.load_tests.is_empty() && self.no_data.is_empty()
    }

    pub fn of_kind(&self, kind: TestKind) -> impl Iterator<Item = &LoadTestResult> {
        self.load_tests.iter().filter(move |r| r.kind == kind)
    }
}

/// Flat CSV form of a [`LoadTestResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CsvRow {
    endpoint: String,
    kind: TestKind,
    mean_ms: f64,
    median_ms: f64,
    min_ms: f64,
    max_ms: f64,
    p95_ms: f64,
    throughput: f64,
    total_requests: u64,
    successful_requests: u64,
    error_count: u64,
    duration_secs: f64,
    cpu_percent: f64,
    memory_percent: f64,
    memory_available_bytes: u64,
    disk_percent: f64,
}

impl From<&LoadTestResult> for CsvRow {
    fn from(r: &LoadTestResult) -> Self {
        Self {
            endpoint: r.endpoint.clone(),
            kind: r.kind,
            mean_ms: r.mean_ms,
            median_ms: r.median_ms,
            min_ms: r.min_ms,
            max_ms: r.max_ms,
            p95_ms: r.p95_ms,
            throughput: r.throughput,
            total_requests: r.total_requests,
            successful_requests: r.successful_requests,
            error_count: r.error_count,
            duration_secs: r.duration_secs,
            cpu_percent: r.resources.cpu_percent,
            memory_percent: r.resources.memory_percent,
            memory_available_bytes: r.resources.memory_available_bytes,
            disk_percent: r.resources.disk_percent,
        }
    }
}

impl From<CsvRow> for LoadTestResult {
    fn from(row: CsvRow) -> Self {
        Self {
            endpoint: row.endpoint,
            kind: row.kind,
            mean_ms: row.mean_ms,
            median_ms: row.median_ms,
            min_ms: row.min_ms,
            max_ms: row.max_ms,
            p95_ms: row.p95_ms,
            throughput: row.throughput,
            total_requests: row.total_requests,
            successful_requests: row.successful_requests,
            error_count: row.error_count,
            duration_secs: row.duration_secs,
            resources: ResourceSnapshot {
                cpu_percent: row.cpu_percent,
                memory_percent: row.memory_percent,
                memory_available_bytes: row.memory_available_bytes,
                disk_percent: row.disk_percent,
            },
        }
    }
}

/// One header row, then one row per load test.
pub fn write_csv<W: Write>(results: &[LoadTestResult], writer: W) -> Result<(), LabError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(CsvRow::from(result))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<LoadTestResult>, LabError> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize::<CsvRow>()
        .map(|row| Ok(row?.into()))
        .collect()
}

/// Nested JSON form of a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(with = "time::serde::timestamp")]
    pub generated_at: OffsetDateTime,
    pub base_url: String,
    #[serde(flatten)]
    pub results: ResultSet,
}

/// Results directory of a suite run.
///
/// Holds [`CSV_FILE`], [`JSON_FILE`] and [`REPORT_FILE`].
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(CSV_FILE)
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(JSON_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Writes the CSV table and the JSON document, replacing earlier files.
    pub fn persist(&self, results: &ResultSet, base_url: &str) -> Result<(), LabError> {
        fs::create_dir_all(&self.dir)?;

        write_csv(&results.load_tests, BufWriter::new(File::create(self.csv_path())?))?;

        let document = ResultsDocument {
            generated_at: OffsetDateTime::now_utc(),
            base_url: base_url.to_string(),
            results: results.clone(),
        };
        write_json(&self.json_path(), &document)?;

        info!(
            "Saved {} results ({} without data) to {}",
            results.load_tests.len(),
            results.no_data.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Reloads the results persisted by [`ResultStore::persist`].
    pub fn load_results(&self) -> Result<Vec<LoadTestResult>, LabError> {
        let path = self.csv_path();
        debug!("Loading results from {}", path.display());
        read_csv(BufReader::new(File::open(path)?))
    }

    pub fn load_document(&self) -> Result<ResultsDocument, LabError> {
        let file = BufReader::new(File::open(self.json_path())?);
        Ok(serde_json::from_reader(file)?)
    }

    pub fn persist_report(&self, report: &StatisticalReport) -> Result<PathBuf, LabError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.report_path();
        write_json(&path, report)?;
        info!("Saved statistical report to {}", path.display());
        Ok(path)
    }

    pub fn load_report(&self) -> Result<StatisticalReport, LabError> {
        let file = BufReader::new(File::open(self.report_path())?);
        Ok(serde_json::from_reader(file)?)
    }

    /// Copies an existing results directory to `<dir>_backup_<unix seconds>`.
    ///
    /// A backup never merges into an existing one: when the name is taken, a `_<n>` suffix is
    /// appended. Returns the backup location, or `None` when there was nothing to back up.
    pub fn backup(&self) -> Result<Option<PathBuf>, LabError> {
        if !self.dir.is_dir() {
            return Ok(None);
        }

        let name = self
            .dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string());
        let stamp = OffsetDateTime::now_utc().unix_timestamp();
        let base = format!("{name}_backup_{stamp}");

        let mut target = self.dir.with_file_name(&base);
        let mut suffix = 1;
        loop {
            match fs::create_dir(&target) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    target = self.dir.with_file_name(format!("{base}_{suffix}"));
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        copy_contents(&self.dir, &target)?;
        info!("Backed up {} to {}", self.dir.display(), target.display());
        Ok(Some(target))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LabError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Copies the entries of `src` into the existing, empty directory `dst`.
fn copy_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir(&target)?;
            copy_contents(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
