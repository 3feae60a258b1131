use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::job::record::{JobId, JobRecord, JobSummary};
use crate::pipeline::artifact::Artifact;
use crate::pipeline::runner::PipelineRunner;
use crate::request::message::read_run_request;

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<JobSummary>,
}

/// Unparseable identities can't name a job, so they're just unknown
fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse::<JobId>().map_err(|_| ApiError::not_found("Job not found"))
}

/// `POST /api/pipeline/run`
pub async fn run_pipeline<R: PipelineRunner>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<Json<JobRecord>, ApiError> {
    let request = read_run_request(&state.schema, &body)?;
    let record = state.manager.submit(request)?;
    Ok(Json(record))
}

/// `GET /api/pipeline/status/:job_id`
pub async fn get_job_status<R: PipelineRunner>(
    State(state): State<Arc<AppState<R>>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    Ok(Json(state.manager.status(&job_id)?))
}

/// `GET /api/pipeline/report/:job_id/:report_type`, rendered HTML
pub async fn get_report<R: PipelineRunner>(
    State(state): State<Arc<AppState<R>>>,
    Path((job_id, report_type)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    let path = state.manager.fetch_artifact(&job_id, &format!("{report_type}_report")).await?;
    if Artifact::report(&report_type).is_none() {
        return Err(ApiError::not_found("Report type not found"));
    }
    let html = tokio::fs::read_to_string(&path).await.map_err(|err| {
        warn!("Can't read report {}: {err}", path.display());
        ApiError::not_found("Report file not found")
    })?;
    Ok(Html(html))
}

/// `GET /api/pipeline/download/:job_id/:file_type`, raw bytes of a data artifact
pub async fn download_file<R: PipelineRunner>(
    State(state): State<Arc<AppState<R>>>,
    Path((job_id, file_type)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    let path = state.manager.fetch_artifact(&job_id, &file_type).await?;
    if Artifact::data(&file_type).is_none() {
        return Err(ApiError::not_found("File not found"));
    }
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        warn!("Can't read artifact {}: {err}", path.display());
        ApiError::not_found("File not found")
    })?;
    let filename = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or(file_type);
    info!("Serving {} ({} bytes) for job {job_id}", path.display(), bytes.len());
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    ))
}

/// `GET /api/jobs`
pub async fn list_jobs<R: PipelineRunner>(State(state): State<Arc<AppState<R>>>) -> Json<JobList> {
    let mut jobs = state.manager.list();
    jobs.sort_by_key(|job| job.created_at);
    Json(JobList { jobs })
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}
