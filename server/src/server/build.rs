//! `/generate` and `/validate`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use build_exec::BuildResponse;
use manifest_scripts::ScriptBundle;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppContext;

#[derive(Debug, Deserialize)]
pub struct YamlRequest {
    #[serde(default)]
    pub yaml_content: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub scripts: Option<ScriptBundle>,
}

impl ValidateResponse {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            scripts: None,
        }
    }
}

pub async fn generate(
    Extension(context): Extension<Arc<AppContext>>,
    payload: Result<Json<YamlRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed /generate request");
            return (
                StatusCode::BAD_REQUEST,
                Json(BuildResponse::failure(rejection.body_text())),
            )
                .into_response();
        }
    };

    let response = context.generate(&request.yaml_content).await;
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn validate(
    Extension(context): Extension<Arc<AppContext>>,
    payload: Result<Json<YamlRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed /validate request");
            return (
                StatusCode::BAD_REQUEST,
                Json(ValidateResponse::invalid(rejection.body_text())),
            )
                .into_response();
        }
    };

    let response = match context.validate(&request.yaml_content) {
        Ok(scripts) => {
            if let Some(warning) = &scripts.warning {
                debug!(%warning, "validated document without usable helm charts");
            }
            ValidateResponse {
                valid: true,
                error: None,
                scripts: Some(scripts),
            }
        }
        Err(error) => ValidateResponse::invalid(error),
    };
    (StatusCode::OK, Json(response)).into_response()
}
