use thiserror::Error;

use crate::job::record::JobId;
use crate::job::state::JobStatus;
use crate::request::contract::ValidationError;

/// Errors surfaced synchronously to callers of the job manager
///
/// Pipeline failures are not here: they end up in the job record and are found by polling.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {id} is {status}, results are available once it has completed")]
    NotReady { id: JobId, status: JobStatus },
    #[error("artifact '{name}' not found for job {id}")]
    ArtifactNotFound { id: JobId, name: String },
    #[error("job {id} can't move from {from} to {to}")]
    IllegalTransition { id: JobId, from: JobStatus, to: JobStatus },
    #[error("{capacity} jobs are already queued or running, try again later")]
    Busy { capacity: usize },
}
