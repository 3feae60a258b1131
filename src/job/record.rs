use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::job::error::JobError;
use crate::job::state::JobStatus;
use crate::request::contract::ParameterContract;

/// Opaque job identity, a random UUID that's never reused
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> JobId {
        JobId(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

/// Everything known about one submitted run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Advisory only, never decreases
    pub progress: f64,
    pub message: String,
    pub params: ParameterContract,
    /// Artifact key -> path, only set once completed
    pub results: Option<BTreeMap<String, PathBuf>>,
}

/// One row of the job listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub project_name: String,
}

impl JobRecord {
    pub fn new(job_id: JobId, params: ParameterContract, now: DateTime<Utc>) -> JobRecord {
        JobRecord {
            job_id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            progress: 0.0,
            message: "Job submitted".to_string(),
            params,
            results: None,
        }
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::IllegalTransition { id: self.job_id, from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    pub fn advance_progress(&mut self, progress: f64) {
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id,
            status: self.status,
            created_at: self.created_at,
            project_name: self.params.project_name().to_string(),
        }
    }
}
