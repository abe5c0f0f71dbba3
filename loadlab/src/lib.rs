#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod evaluator;
pub mod probe;
pub mod sampler;

mod error;

pub use error::LabError;
pub use load_test::{run_load, LoadTest};

/// Re-export of the data model and configuration types.
pub use loadlab_core as core;

pub mod prelude {
    pub use crate::aggregator::{ResultSet, ResultStore};
    pub use crate::evaluator::{evaluate, Evaluator, StatisticalReport, Verdict};
    pub use crate::load_test::{run_load, LoadTest};
    pub use crate::probe::{ResourceProbe, SystemProbe};
    pub use crate::sampler::HttpSampler;
    pub use crate::LabError;

    pub use loadlab_core::{
        HypothesisConfig, LoadConfig, LoadOutcome, LoadTestResult, RequestMethod,
        ResourceSnapshot, SampleResult, SuiteConfig, TestKind,
    };
}
