use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info, warn};
use tokio::sync::Semaphore;

use crate::job::error::JobError;
use crate::job::record::{JobId, JobRecord, JobSummary};
use crate::job::state::JobStatus;
use crate::job::store::JobStore;
use crate::job::workdir::WorkingDirectory;
use crate::pipeline::runner::{ExecutionResult, PipelineRunner};
use crate::request::contract::{ParameterContract, RunRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const COMPLETED_MESSAGE: &str = "completed";
pub const TIMEOUT_MESSAGE: &str = "execution exceeded time budget";
pub const INTERNAL_FAILURE_MESSAGE: &str = "internal error while running the pipeline";

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Parent of every job's working directory
    pub runs_root: PathBuf,
    /// Wall-clock limit for one pipeline run
    pub timeout: Duration,
    /// Pipelines allowed to execute at the same time
    pub max_concurrent: usize,
    /// Jobs allowed in flight (pending or running) before submissions are turned away
    pub max_queued: usize,
}

impl ManagerConfig {
    pub fn new(runs_root: PathBuf) -> ManagerConfig {
        ManagerConfig { runs_root, timeout: DEFAULT_TIMEOUT, max_concurrent: 4, max_queued: 64 }
    }
}

/// Accepts run requests, executes them in the background and tracks their state
///
/// Submission never waits on the pipeline. Each accepted job holds an admission permit until
/// it's terminal, and an execution permit while the pipeline runs, so a full queue is rejected
/// up front instead of piling up child processes.
pub struct JobManager<R> {
    store: JobStore,
    runner: R,
    config: ManagerConfig,
    admission: Arc<Semaphore>,
    workers: Semaphore,
}

impl<R: PipelineRunner> JobManager<R> {
    pub fn new(runner: R, config: ManagerConfig) -> JobManager<R> {
        let admission = Arc::new(Semaphore::new(permits(config.max_queued)));
        let workers = Semaphore::new(permits(config.max_concurrent));
        JobManager { store: JobStore::new(), runner, config, admission, workers }
    }

    /// Validate a request, record a pending job and dispatch it in the background
    ///
    /// Must be called from within a tokio runtime. Returns the pending snapshot straight away.
    pub fn submit(self: &Arc<Self>, request: RunRequest) -> Result<JobRecord, JobError> {
        let params = ParameterContract::validate(request).map_err(|err| {
            warn!("Rejecting run request: {err}");
            err
        })?;
        let admission = Arc::clone(&self.admission).try_acquire_owned().map_err(|_| {
            warn!("Rejecting run request for {}, job queue is full", params.project_name());
            JobError::Busy { capacity: self.config.max_queued }
        })?;

        let record = self.store.create(params);
        let job_id = record.job_id;
        info!("Submitted job {job_id} for project {}", record.params.project_name());

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.dispatch(job_id).await;
            drop(admission);
        });

        Ok(record)
    }

    pub fn status(&self, job_id: &JobId) -> Result<JobRecord, JobError> {
        self.store.get(job_id)
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.store.list()
    }

    /// Resolve an artifact of a completed job to a path that exists right now
    pub async fn fetch_artifact(&self, job_id: &JobId, name: &str) -> Result<PathBuf, JobError> {
        let record = self.store.get(job_id)?;
        if record.status != JobStatus::Completed {
            return Err(JobError::NotReady { id: *job_id, status: record.status });
        }
        let not_found = || JobError::ArtifactNotFound { id: *job_id, name: name.to_string() };
        let path = record
            .results
            .and_then(|mut results| results.remove(name))
            .ok_or_else(not_found)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            Ok(false) => {
                warn!("Job {job_id} completed but artifact {name} is missing at {}", path.display());
                Err(not_found())
            }
            Err(err) => {
                warn!("Can't check artifact {name} of job {job_id} at {}: {err}", path.display());
                Err(not_found())
            }
        }
    }

    /// Run a job to a terminal state, whatever happens on the way
    ///
    /// Execution runs in its own task so a panic inside the runner is caught here too.
    async fn dispatch(self: Arc<Self>, job_id: JobId) {
        let manager = Arc::clone(&self);
        let execution = tokio::spawn(async move { manager.execute(job_id).await });

        let finished = match execution.await {
            Ok(Ok(result)) => self.finish(&job_id, result),
            Ok(Err(err)) => {
                error!("Job {job_id} failed during dispatch: {err:#}");
                self.fail(&job_id, INTERNAL_FAILURE_MESSAGE)
            }
            Err(err) => {
                error!("Job {job_id} execution task died: {err}");
                self.fail(&job_id, INTERNAL_FAILURE_MESSAGE)
            }
        };

        match finished {
            Ok(record) if record.status.is_terminal() => info!("Job {job_id} finished as {}", record.status),
            Ok(record) => error!("Job {job_id} left {} after dispatch", record.status),
            Err(err) => error!("Can't record final state of job {job_id}: {err}"),
        }
    }

    async fn execute(&self, job_id: JobId) -> anyhow::Result<ExecutionResult> {
        let _permit = self.workers.acquire().await.context("Worker pool closed")?;

        let record = self.store.update(&job_id, |record| {
            record.transition(JobStatus::Running)?;
            record.advance_progress(0.1);
            record.message = "Pipeline running".to_string();
            Ok(())
        })?;
        info!("Job {job_id} is running");

        let wd = WorkingDirectory::for_job(&self.config.runs_root, &job_id);
        wd.prepare(&record.params).await?;
        self.store.update(&job_id, |record| {
            record.advance_progress(0.2);
            Ok(())
        })?;

        self.runner.execute(&record.params, &wd.path, self.config.timeout).await
    }

    fn finish(&self, job_id: &JobId, result: ExecutionResult) -> Result<JobRecord, JobError> {
        match result {
            ExecutionResult::Success { artifacts } => self.store.update(job_id, |record| {
                record.transition(JobStatus::Completed)?;
                record.advance_progress(1.0);
                record.message = COMPLETED_MESSAGE.to_string();
                record.results = Some(artifacts);
                Ok(())
            }),
            ExecutionResult::Failure { exit_code, diagnostics } => {
                let code = exit_code.map_or_else(|| "unknown".to_string(), |code| code.to_string());
                warn!("Job {job_id} pipeline failed with exit code {code}");
                self.fail(job_id, &format!("pipeline failed (exit code {code}): {diagnostics}"))
            }
            ExecutionResult::Timeout { limit } => {
                warn!("Job {job_id} pipeline timed out after {}s", limit.as_secs_f64());
                self.fail(job_id, TIMEOUT_MESSAGE)
            }
        }
    }

    // a job that never got a worker still passes through running so the state machine holds
    fn fail(&self, job_id: &JobId, message: &str) -> Result<JobRecord, JobError> {
        self.store.update(job_id, |record| {
            if record.status == JobStatus::Pending {
                record.transition(JobStatus::Running)?;
            }
            record.transition(JobStatus::Failed)?;
            record.message = message.to_string();
            Ok(())
        })
    }
}

fn permits(requested: usize) -> usize {
    requested.clamp(1, Semaphore::MAX_PERMITS)
}
