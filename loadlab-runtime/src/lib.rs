//! Suite runner and command line interface for loadlab.
//!
//! A suite is an ordered list of [`Step`]s: the performance lab (connectivity check, one normal
//! load test per endpoint, one stress test, persistence) and the statistical analysis of the
//! persisted results.
mod error;
pub mod runtime;
pub mod suite;

pub use error::RuntimeError;
pub use runtime::{LabRuntime, DEFAULT_LOG_FILTER};
pub use suite::{Step, StepRecord, StepStatus, Suite, SuiteSummary};
