use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::job::error::JobError;
use crate::request::contract::ValidationError;

/// An error response: a status code and a JSON body with a `detail` message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    violations: Vec<String>,
}

#[derive(Serialize)]
struct ApiErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> ApiError {
        ApiError { status, detail: detail.into(), violations: Vec::new() }
    }

    pub fn not_found(detail: impl Into<String>) -> ApiError {
        ApiError::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> ApiError {
        ApiError::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> ApiError {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: "invalid run request".to_string(),
            violations: err.violations,
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> ApiError {
        match err {
            JobError::Validation(err) => err.into(),
            JobError::NotFound(_) => ApiError::not_found("Job not found"),
            JobError::NotReady { .. } => ApiError::bad_request("Pipeline not completed"),
            JobError::ArtifactNotFound { .. } => ApiError::not_found(err.to_string()),
            JobError::Busy { .. } => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            JobError::IllegalTransition { .. } => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody { detail: self.detail, violations: self.violations };
        (self.status, Json(body)).into_response()
    }
}
