//! HTTP endpoints for uploads and job status polling.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use pipeline::stages::status::{self, StatusProjection};
use pipeline::stages::upload::{self, UploadRequest};
use pipeline::{PipelineContext, PipelineError};

/// API error wrapper mapping pipeline error kinds onto status codes.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            PipelineError::JobNotFound => {
                (StatusCode::NOT_FOUND, "File key not found".to_string())
            }
            err if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            err => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file_key: String,
}

/// POST /upload - multipart body with a `file` field, returns the job key
pub async fn upload(
    State(ctx): State<Arc<PipelineContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(PipelineError::MalformedContentType)?
        .to_string();

    let base64_encoded = headers
        .get("content-transfer-encoding")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("base64"));

    let file_key = upload::handle(
        &ctx,
        UploadRequest {
            content_type,
            body: body.to_vec(),
            base64_encoded,
        },
    )
    .await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully.",
        file_key,
    }))
}

/// GET /status/:file_key - current stage/status projection for a job
pub async fn job_status(
    State(ctx): State<Arc<PipelineContext>>,
    Path(file_key): Path<String>,
) -> Result<Json<StatusProjection>, ApiError> {
    let projection = status::project(&ctx.jobs, &file_key)?;
    Ok(Json(projection))
}
