use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::pipeline::artifact::Artifact;
use crate::pipeline::capture::{read_bounded, Captured, CAPTURE_LIMIT};
use crate::pipeline::command::PipelineCommand;
use crate::request::contract::ParameterContract;

/// How long to wait for output readers after the child exits
///
/// Grandchildren that inherited the pipes can keep them open long after the pipeline exits.
const READER_GRACE: Duration = Duration::from_secs(5);

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Exit status 0. Artifact paths are where the outputs should be, not proof they exist.
    Success { artifacts: BTreeMap<String, PathBuf> },
    /// Nonzero exit, or killed by a signal (no exit code)
    Failure { exit_code: Option<i32>, diagnostics: String },
    /// Still running when the time limit ran out, so it was killed
    Timeout { limit: Duration },
}

/// Something that can execute a pipeline run to completion
///
/// `Err` is reserved for faults in getting the run going at all (spawn failures, IO errors),
/// never for the pipeline itself failing.
pub trait PipelineRunner: Send + Sync + 'static {
    fn execute(
        &self,
        params: &ParameterContract,
        work_dir: &Path,
        timeout: Duration,
    ) -> impl Future<Output = anyhow::Result<ExecutionResult>> + Send;
}

/// Runs the pipeline as a child process
pub struct ProcessRunner {
    command: PipelineCommand,
    capture_limit: usize,
}

impl ProcessRunner {
    pub fn new(command: PipelineCommand) -> ProcessRunner {
        ProcessRunner { command, capture_limit: CAPTURE_LIMIT }
    }
}

impl PipelineRunner for ProcessRunner {
    async fn execute(
        &self,
        params: &ParameterContract,
        work_dir: &Path,
        timeout: Duration,
    ) -> anyhow::Result<ExecutionResult> {
        let args = self.command.arguments(params, work_dir);
        let mut command = Command::new(&self.command.program);
        command
            .args(&args)
            .current_dir(&self.command.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // own process group, so a timeout can take down everything the pipeline started
        #[cfg(unix)]
        command.process_group(0);

        info!("Running pipeline process");
        info!("{} {}", self.command.program.display(), args.join(" "));
        let mut child = command.spawn().with_context(|| {
            format!("Can't start pipeline executable {}", self.command.program.display())
        })?;

        let stdout = child.stdout.take().context("Pipeline stdout is piped")?;
        let stderr = child.stderr.take().context("Pipeline stderr is piped")?;
        let stdout_reader = tokio::spawn(read_bounded(stdout, self.capture_limit));
        let stderr_reader = tokio::spawn(read_bounded(stderr, self.capture_limit));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status.context("Wait for pipeline process")?,
            Err(_) => {
                warn!("Pipeline exceeded its {}s time limit, killing it", timeout.as_secs_f64());
                kill_process_group(&child);
                if let Err(err) = child.kill().await {
                    warn!("Can't kill timed out pipeline process: {err}");
                }
                stdout_reader.abort();
                stderr_reader.abort();
                return Ok(ExecutionResult::Timeout { limit: timeout });
            }
        };

        let stdout = collect(stdout_reader, "stdout").await;
        let stderr = collect(stderr_reader, "stderr").await;

        if status.success() {
            info!("Pipeline exited 0");
            return Ok(ExecutionResult::Success { artifacts: Artifact::resolve_all(work_dir) });
        }

        warn!("Pipeline exited with {status}");
        // nextflow reports most errors on stderr but some only on stdout
        let diagnostics = if stderr.is_blank() { stdout.text() } else { stderr.text() };
        Ok(ExecutionResult::Failure { exit_code: status.code(), diagnostics })
    }
}

/// SIGKILL every process in the pipeline's group, including the ones it started
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        warn!("Can't kill pipeline process group {pgid}: {err}");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

async fn collect(mut reader: JoinHandle<io::Result<Captured>>, stream: &str) -> Captured {
    match tokio::time::timeout(READER_GRACE, &mut reader).await {
        Ok(Ok(Ok(captured))) => captured,
        Ok(Ok(Err(err))) => {
            warn!("Can't read pipeline {stream}: {err}");
            Captured::default()
        }
        Ok(Err(err)) => {
            warn!("Pipeline {stream} reader stopped: {err}");
            Captured::default()
        }
        Err(_) => {
            warn!("Pipeline {stream} still open after exit, giving up on it");
            reader.abort();
            Captured::default()
        }
    }
}
