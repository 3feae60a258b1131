//! Fixtures and stand-in pipeline runners shared by unit tests

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::Semaphore;

use crate::job::manager::{JobManager, ManagerConfig};
use crate::job::record::{JobId, JobRecord};
use crate::job::state::JobStatus;
use crate::pipeline::artifact::Artifact;
use crate::pipeline::runner::{ExecutionResult, PipelineRunner};
use crate::request::contract::{ParameterContract, RunRequest};

/// tumor A, normal B, hg38, project P1, VAF 0.03..0.99
pub fn scenario_request() -> RunRequest {
    RunRequest {
        tumor_bam: "A".to_string(),
        normal_bam: "B".to_string(),
        reference_genome: "hg38".to_string(),
        project_name: "P1".to_string(),
        min_coverage: 100.into(),
        vaf_threshold: 0.03,
        max_vaf: 0.99,
        mito_position: None,
        mito_mutant_base: None,
        mito_min_spacer: None,
        mito_max_spacer: None,
    }
}

pub fn mito_request() -> RunRequest {
    RunRequest {
        mito_position: Some(3243.into()),
        mito_mutant_base: Some("G".to_string()),
        ..scenario_request()
    }
}

pub fn scenario_contract() -> ParameterContract {
    ParameterContract::validate(scenario_request()).unwrap()
}

pub fn mito_contract() -> ParameterContract {
    ParameterContract::validate(mito_request()).unwrap()
}

pub fn manager_with<R: PipelineRunner>(runner: R, runs_root: &Path) -> Arc<JobManager<R>> {
    Arc::new(JobManager::new(runner, ManagerConfig::new(runs_root.to_path_buf())))
}

pub async fn wait_for_status<R: PipelineRunner>(
    manager: &JobManager<R>,
    job_id: &JobId,
    status: JobStatus,
) -> JobRecord {
    for _ in 0..500 {
        let record = manager.status(job_id).unwrap();
        if record.status == status {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached {status}");
}

pub async fn wait_for_terminal<R: PipelineRunner>(
    manager: &JobManager<R>,
    job_id: &JobId,
) -> JobRecord {
    for _ in 0..500 {
        let record = manager.status(job_id).unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}

/// Exits 0 straight away, optionally writing every artifact first
#[derive(Default)]
pub struct SucceedingRunner {
    pub write_artifacts: bool,
}

impl PipelineRunner for SucceedingRunner {
    async fn execute(
        &self,
        _params: &ParameterContract,
        work_dir: &Path,
        _timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        if self.write_artifacts {
            for artifact in Artifact::ALL {
                let path = artifact.path_in(work_dir);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, format!("{artifact} contents")).await?;
            }
        }
        Ok(ExecutionResult::Success { artifacts: Artifact::resolve_all(work_dir) })
    }
}

/// Always ends the same way
pub struct StaticRunner(pub ExecutionResult);

impl PipelineRunner for StaticRunner {
    async fn execute(
        &self,
        _params: &ParameterContract,
        _work_dir: &Path,
        _timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        Ok(self.0.clone())
    }
}

/// Can't even start the pipeline
pub struct ErroringRunner;

impl PipelineRunner for ErroringRunner {
    async fn execute(
        &self,
        _params: &ParameterContract,
        _work_dir: &Path,
        _timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        Err(anyhow!("pipeline executable vanished"))
    }
}

pub struct PanickingRunner;

impl PipelineRunner for PanickingRunner {
    async fn execute(
        &self,
        _params: &ParameterContract,
        _work_dir: &Path,
        _timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        explode()
    }
}

fn explode() -> anyhow::Result<ExecutionResult> {
    panic!("runner exploded")
}

/// Succeeds once a permit is added to its gate, one job per permit
pub struct GatedRunner {
    gate: Arc<Semaphore>,
}

impl GatedRunner {
    pub fn new() -> GatedRunner {
        GatedRunner { gate: Arc::new(Semaphore::new(0)) }
    }

    pub fn gate(&self) -> Arc<Semaphore> {
        Arc::clone(&self.gate)
    }
}

impl PipelineRunner for GatedRunner {
    async fn execute(
        &self,
        _params: &ParameterContract,
        work_dir: &Path,
        _timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        self.gate.acquire().await?.forget();
        Ok(ExecutionResult::Success { artifacts: Artifact::resolve_all(work_dir) })
    }
}
