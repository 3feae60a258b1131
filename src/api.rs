//! HTTP interface: submit runs, poll their status, fetch results, upload inputs
//!
//! Handlers validate and translate requests, then call the job manager. They never touch job
//! records directly.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::job::manager::JobManager;
use crate::pipeline::runner::PipelineRunner;
use crate::request::schema::RequestSchema;

pub mod error;
pub mod routes;
pub mod upload;

pub struct AppState<R> {
    pub manager: Arc<JobManager<R>>,
    pub schema: RequestSchema,
    pub uploads_root: PathBuf,
}

pub fn router<R: PipelineRunner>(state: Arc<AppState<R>>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/pipeline/run", post(routes::run_pipeline::<R>))
        .route("/api/pipeline/status/:job_id", get(routes::get_job_status::<R>))
        .route("/api/pipeline/report/:job_id/:report_type", get(routes::get_report::<R>))
        .route("/api/pipeline/download/:job_id/:file_type", get(routes::download_file::<R>))
        .route(
            "/api/upload/bam",
            post(upload::upload_bam::<R>).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/jobs", get(routes::list_jobs::<R>))
        .route("/health", get(routes::health))
        .with_state(state)
}
