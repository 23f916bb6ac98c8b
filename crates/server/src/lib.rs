//! ReportForge HTTP adapter.
//!
//! Exposes the build pipeline over HTTP:
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/generate` | `POST` | `application/pdf` attachment, or a JSON [`ErrorBody`] |
//! | `/health` | `GET` | `{"status": "ok"}` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request decoding, CORS, body limits, and status-code
//! mapping live here. The [`pipeline`] crate never sees HTTP types.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pipeline::{BuildPipeline, BuildRequest};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;

pub use error::{status_for, ApiError, ErrorBody};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BuildPipeline>,
}

/// Builds the application router.
pub fn router(pipeline: BuildPipeline) -> Router {
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    pipeline: BuildPipeline,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let doc = state.pipeline.build(&request).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&doc.file_name)),
        (header::LAST_MODIFIED, doc.compiled_at.to_http_date()),
    ];
    Ok((headers, doc.bytes).into_response())
}

/// `attachment` disposition with an ASCII `filename` and, for non-ASCII
/// names, an RFC 5987 `filename*`.
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();
    if ascii == file_name {
        return format!("attachment; filename=\"{ascii}\"");
    }

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}
