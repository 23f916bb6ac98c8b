//! HTTP-level tests driving the router with a stub compiler.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pipeline::{
    AssetStager, BuildLayout, BuildPipeline, ClassificationKey, CompileOutcome, DocumentCompiler,
    TemplateName, TemplateSet, WorkspaceRoot,
};
use serde_json::{json, Value};
use server::{router, ErrorBody, MAX_BODY_BYTES};
use tempfile::TempDir;
use tower::ServiceExt;

/// Writes `%PDF-` followed by the data file, or fails with a fixed diagnostic
/// when the title is "broken".
struct EchoCompiler {
    layout: BuildLayout,
}

#[async_trait]
impl DocumentCompiler for EchoCompiler {
    fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    async fn compile(&self, workspace: &Path) -> std::io::Result<CompileOutcome> {
        let data = fs::read_to_string(workspace.join(&self.layout.data_file))?;
        let parsed: Value = serde_json::from_str(&data).map_err(std::io::Error::other)?;
        if parsed["title"] == "broken" {
            return Ok(CompileOutcome::Failed {
                exit_code: Some(1),
                diagnostics: "error: unexpected end of block".into(),
            });
        }
        fs::write(
            workspace.join(&self.layout.artifact_file),
            format!("%PDF-{data}"),
        )?;
        Ok(CompileOutcome::Succeeded { log: String::new() })
    }
}

fn app(tmp: &TempDir, with_templates: bool) -> Router {
    let templates = tmp.path().join("templates");
    let assets = tmp.path().join("assets");
    fs::create_dir_all(&templates).unwrap();
    fs::create_dir_all(&assets).unwrap();
    if with_templates {
        fs::write(templates.join("edu_report.typ"), "edu").unwrap();
        fs::write(templates.join("paper.typ"), "paper").unwrap();
    }

    let set = TemplateSet::new(
        &templates,
        BTreeMap::from([(
            ClassificationKey::new("教育见习"),
            TemplateName::new("edu_report.typ").unwrap(),
        )]),
        vec![TemplateName::new("paper.typ").unwrap()],
    );
    let pipeline = BuildPipeline::new(
        set,
        AssetStager::new(&assets),
        WorkspaceRoot::new(tmp.path().join("builds")),
        Arc::new(EchoCompiler {
            layout: BuildLayout::typst(),
        }),
    );
    router(pipeline)
}

fn post_json(body: Value) -> Request<Body> {
    Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn health_reports_ok() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn generate_returns_pdf_attachment() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(post_json(json!({
            "course": "教育见习",
            "title": "见习报告",
            "student_id": "20230001",
            "content_blocks": [{ "type": "text", "content": "正文" }]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_20230001.pdf\""
    );
    assert!(response.headers().contains_key(header::LAST_MODIFIED));

    let bytes = body_bytes(response).await;
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("%PDF-"));
    assert!(text.contains("\"title\": \"见习报告\""));
}

#[tokio::test]
async fn compiler_failure_is_422_with_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(post_json(json!({ "course": "x", "title": "broken" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.error, "compilation");
    assert_eq!(body.detail, "error: unexpected end of block");
}

#[tokio::test]
async fn missing_templates_are_500() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(post_json(json!({ "course": "教育见习" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.error, "template_not_found");
}

#[tokio::test]
async fn unknown_block_type_is_rejected_before_building() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(post_json(json!({
            "course": "x",
            "content_blocks": [{ "type": "video", "path": "a.mp4" }]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.error, "invalid_request");
    assert!(!tmp.path().join("builds").exists());
}

#[tokio::test]
async fn missing_classification_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(post_json(json!({ "title": "no course" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let tmp = TempDir::new().unwrap();
    let padding = "a".repeat(MAX_BODY_BYTES);
    let body = format!(r#"{{"course":"x","title":"{padding}"}}"#);
    let response = app(&tmp, true)
        .oneshot(
            Request::post("/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!tmp.path().join("builds").exists());
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/generate")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn simple_requests_carry_allow_origin() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
