//! Mapping from build failures to HTTP responses.
//!
//! This is the only place transport status codes are decided.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::{BuildError, BuildErrorKind};
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable failure kind (`"compilation"`, `"template_not_found"`, ...).
    pub error: String,
    /// Human-readable message; for compilation failures, the compiler's own output.
    pub detail: String,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status code for each build failure kind.
pub fn status_for(kind: BuildErrorKind) -> StatusCode {
    match kind {
        BuildErrorKind::Compilation => StatusCode::UNPROCESSABLE_ENTITY,
        BuildErrorKind::CompilationTimeout => StatusCode::GATEWAY_TIMEOUT,
        BuildErrorKind::Resource
        | BuildErrorKind::TemplateNotFound
        | BuildErrorKind::Serialization
        | BuildErrorKind::ArtifactMissing => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        let kind = err.kind();
        let detail = match err {
            BuildError::Compilation { diagnostics, .. } => diagnostics,
            other => other.to_string(),
        };
        Self {
            status: status_for(kind),
            body: ErrorBody {
                error: kind.as_str().to_string(),
                detail,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            body: ErrorBody {
                error: "invalid_request".to_string(),
                detail: rejection.body_text(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
