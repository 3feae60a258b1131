use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::Json;
use log::{info, warn};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::pipeline::runner::PipelineRunner;

const UPLOAD_FIELD: &str = "file";
const FALLBACK_FILENAME: &str = "upload.bam";

/// A stored upload; `path` can be used as a sample reference in a run request
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub file_id: Uuid,
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// `POST /api/upload/bam`, multipart with the BAM in field `file`
pub async fn upload_bam<R: PipelineRunner>(
    State(state): State<Arc<AppState<R>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = safe_filename(field.file_name().unwrap_or(FALLBACK_FILENAME));
        let file_id = Uuid::new_v4();
        let path = state.uploads_root.join(format!("{file_id}_{filename}"));
        info!("Receiving upload {filename} into {}", path.display());

        let size = match store_field(field, &path).await {
            Ok(size) => size,
            Err(err) => {
                if let Err(err) = tokio::fs::remove_file(&path).await {
                    warn!("Can't remove partial upload {}: {err}", path.display());
                }
                return Err(err);
            }
        };

        info!("Stored upload {} ({size} bytes)", path.display());
        return Ok(Json(UploadedFile { file_id, filename, path, size }));
    }

    Err(ApiError::bad_request(format!("multipart field '{UPLOAD_FIELD}' is required")))
}

/// Stream a multipart field to disk chunk by chunk, returning its size
async fn store_field(mut field: Field<'_>, path: &Path) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::create(path).await.map_err(|err| storage_error(path, err))?;
    let mut size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(body_error)? {
        file.write_all(&chunk).await.map_err(|err| storage_error(path, err))?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(|err| storage_error(path, err))?;
    Ok(size)
}

/// A broken or oversized request body; an oversized one is 413
fn body_error(err: MultipartError) -> ApiError {
    warn!("Can't read upload body: {err}");
    ApiError::new(err.status(), format!("Upload failed: {}", err.body_text()))
}

fn storage_error(path: &Path, err: io::Error) -> ApiError {
    warn!("Can't store upload at {}: {err}", path.display());
    ApiError::internal(format!("Upload failed: {err}"))
}

/// Keep only the last path component of a client supplied name
fn safe_filename(name: &str) -> String {
    match name.rsplit(['/', '\\']).next().map(str::trim) {
        Some(base) if !base.is_empty() && base != "." && base != ".." => base.to_string(),
        _ => FALLBACK_FILENAME.to_string(),
    }
}
