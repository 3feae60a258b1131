use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};

use crate::job::record::JobId;
use crate::request::contract::ParameterContract;

/// A job's working directory, where the pipeline writes its output tree
///
/// Each job gets `<runs root>/<job id>`, owned by that job alone until it reaches a terminal state.
pub struct WorkingDirectory {
    pub path: PathBuf,
}

impl WorkingDirectory {
    pub fn for_job(runs_root: &Path, job_id: &JobId) -> WorkingDirectory {
        WorkingDirectory { path: runs_root.join(job_id.to_string()) }
    }

    /// Create the directory and record the run parameters next to the pipeline output
    pub async fn prepare(&self, params: &ParameterContract) -> anyhow::Result<()> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            warn!("Job directory {} already exists, files may be overwritten", self.path.display());
        }
        info!("Creating working directory {}", self.path.display());
        tokio::fs::create_dir_all(&self.path)
            .await
            .with_context(|| format!("Can't create working directory {}", self.path.display()))?;
        write_params(params, &self.path).await
    }
}

/// Write run parameters to working directory
async fn write_params(params: &ParameterContract, work_dir: &Path) -> anyhow::Result<()> {
    let params_file = serde_json::to_string_pretty(params).context("Serialise run parameters")?;
    let out_path = work_dir.join("params.json");
    info!("Writing params to {}", out_path.display());
    tokio::fs::write(&out_path, params_file)
        .await
        .with_context(|| format!("Can't write {}", out_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mito_contract;

    #[tokio::test]
    async fn prepare_creates_directory_with_params() {
        let runs = tempfile::tempdir().unwrap();
        let job_id = JobId::generate();
        let wd = WorkingDirectory::for_job(runs.path(), &job_id);
        wd.prepare(&mito_contract()).await.unwrap();

        assert_eq!(wd.path, runs.path().join(job_id.to_string()));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(wd.path.join("params.json")).unwrap()).unwrap();
        assert_eq!(written["tumor_bam"], "A");
        assert_eq!(written["reference_genome"], "hg38");
        assert_eq!(written["mito"]["mutant_base"], "G");
    }

    #[tokio::test]
    async fn prepare_fails_when_runs_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("runs");
        std::fs::write(&not_a_dir, b"oops").unwrap();
        let wd = WorkingDirectory::for_job(&not_a_dir, &JobId::generate());
        assert!(wd.prepare(&mito_contract()).await.is_err());
    }
}
