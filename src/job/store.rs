use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::job::error::JobError;
use crate::job::record::{JobId, JobRecord, JobSummary};
use crate::request::contract::ParameterContract;

/// In-memory map of job identity to job record, the single source of truth for job state
///
/// Every operation holds the lock for a bounded, synchronous critical section: no await, no IO.
/// Readers get clones, so nobody ever sees a record half way through an update.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    pub fn new() -> JobStore {
        JobStore::default()
    }

    /// Insert a fresh pending record and return a snapshot of it
    pub fn create(&self, params: ParameterContract) -> JobRecord {
        let mut jobs = self.write();
        let mut job_id = JobId::generate();
        while jobs.contains_key(&job_id) {
            job_id = JobId::generate();
        }
        let record = JobRecord::new(job_id, params, Utc::now());
        jobs.insert(job_id, record.clone());
        record
    }

    pub fn get(&self, job_id: &JobId) -> Result<JobRecord, JobError> {
        self.read().get(job_id).cloned().ok_or(JobError::NotFound(*job_id))
    }

    /// Apply `mutate` atomically and stamp the update time
    ///
    /// The mutation runs on a copy that replaces the stored record only if `mutate` succeeds,
    /// so a rejected change leaves the record exactly as it was.
    pub fn update<F>(&self, job_id: &JobId, mutate: F) -> Result<JobRecord, JobError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), JobError>,
    {
        let mut jobs = self.write();
        let stored = jobs.get_mut(job_id).ok_or(JobError::NotFound(*job_id))?;
        let mut next = stored.clone();
        mutate(&mut next)?;
        next.updated_at = next.updated_at.max(Utc::now());
        *stored = next;
        Ok(stored.clone())
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.read().values().map(JobRecord::summary).collect()
    }

    // a panic while holding the lock can't leave a half-written record behind, see update
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}
