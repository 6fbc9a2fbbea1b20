//! `/samples` and `/samples/:filename`

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use tracing::{error, warn};

use crate::config::AppContext;
use crate::samples::SampleError;

pub async fn list_samples(Extension(context): Extension<Arc<AppContext>>) -> Response {
    match context.samples.list() {
        Ok(samples) => (StatusCode::OK, Json(json!({ "samples": samples }))).into_response(),
        Err(err) => {
            error!(error = %err, "failed to list samples");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn get_sample(
    Extension(context): Extension<Arc<AppContext>>,
    Path(filename): Path<String>,
) -> Response {
    match context.samples.read(&filename) {
        Ok(content) => (StatusCode::OK, Json(json!({ "content": content }))).into_response(),
        Err(err) => {
            let status = match &err {
                SampleError::InvalidFileType | SampleError::InvalidName => StatusCode::BAD_REQUEST,
                SampleError::NotFound => StatusCode::NOT_FOUND,
                SampleError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                error!(%filename, error = %err, "failed to read sample");
            } else {
                warn!(%filename, error = %err, "sample request rejected");
            }
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}
