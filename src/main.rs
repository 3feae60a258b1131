use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use log::{error, info};

use crate::api::AppState;
use crate::job::manager::{JobManager, ManagerConfig};
use crate::pipeline::command::PipelineCommand;
use crate::pipeline::runner::ProcessRunner;
use crate::request::schema::RequestSchema;

mod api;
mod job;
mod pipeline;
mod request;
#[cfg(test)]
mod testing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the WGS + MitoEdit pipeline behind an HTTP API")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
    /// Pipeline installation directory. Job output goes to <base-dir>/runs, uploads to
    /// <base-dir>/uploads
    #[arg(long, default_value = "/data/pipeline")]
    base_dir: PathBuf,
    /// Pipeline executable
    #[arg(long, default_value = "nextflow")]
    pipeline_bin: PathBuf,
    /// Workflow script passed to `<pipeline-bin> run`
    #[arg(long, default_value = "main.nf")]
    pipeline_script: String,
    /// Execution profile
    #[arg(long, default_value = "docker")]
    pipeline_profile: String,
    /// Wall-clock limit for one pipeline run, in seconds
    #[arg(long, default_value_t = 3600)]
    timeout_secs: u64,
    /// Pipelines allowed to run at the same time
    #[arg(long, default_value_t = 4)]
    max_concurrent: usize,
    /// Jobs allowed in flight before new submissions are rejected
    #[arg(long, default_value_t = 64)]
    max_queued: usize,
    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 51200)]
    max_upload_mb: usize,
}

/// Directory layout under the base directory
struct BaseDirectory {
    path: PathBuf,
}

impl BaseDirectory {
    fn runs(&self) -> PathBuf {
        self.path.join("runs")
    }

    fn uploads(&self) -> PathBuf {
        self.path.join("uploads")
    }

    fn prepare(&self) -> anyhow::Result<()> {
        for dir in [self.runs(), self.uploads()] {
            if !dir.exists() {
                info!("Creating directory {}", dir.display())
            }
            fs::create_dir_all(&dir).with_context(|| format!("Can't create {}", dir.display()))?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    info!("terve! starting up :)");

    let args = Args::parse();
    ensure!(args.max_concurrent > 0, "--max-concurrent must be at least 1");
    ensure!(args.max_queued > 0, "--max-queued must be at least 1");

    let base = BaseDirectory { path: args.base_dir.clone() };
    base.prepare()?;

    let command = PipelineCommand::nextflow(
        &args.pipeline_bin,
        &args.pipeline_script,
        &args.pipeline_profile,
        &base.path,
    );
    let config = ManagerConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        max_concurrent: args.max_concurrent,
        max_queued: args.max_queued,
        ..ManagerConfig::new(base.runs())
    };
    info!(
        "Pipeline time limit {}s, {} concurrent runs, {} jobs in flight",
        args.timeout_secs, args.max_concurrent, args.max_queued
    );

    let state = Arc::new(AppState {
        manager: Arc::new(JobManager::new(ProcessRunner::new(command), config)),
        schema: RequestSchema::load()?,
        uploads_root: base.uploads(),
    });
    let app = api::router(state, args.max_upload_mb.saturating_mul(1024 * 1024));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Can't bind {}", args.bind))?;
    info!("Listening on {}", args.bind);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Bye!");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(err) => {
            error!("Can't listen for Ctrl-C, running until killed: {err}");
            std::future::pending::<()>().await
        }
    }
}
