//! File-level orchestration: find inputs, run the numeric core and write the
//! results.

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::extent::ExtentError;
use crate::grid::FieldError;
use crate::readers::ReadError;
use crate::writers::WriteError;

pub mod batch_runner;

pub use batch_runner::{BatchRunner, JobOutput};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Extent(#[from] ExtentError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("job '{job}' failed: {source}")]
    Job {
        job: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub(crate) fn in_job(self, job: &str) -> Self {
        PipelineError::Job {
            job: job.to_string(),
            source: Box::new(self),
        }
    }
}
