//! Integration tests for aiac-web API endpoints
//!
//! Tests cover:
//! - Health and build info endpoints
//! - Upload validation and inspection (`/upload`, `/project-info`)
//! - Simulated compile and download (`/compile`)
//! - Stage table for the browser (`/api/compile/stages`)

mod helpers;

use std::io::{Cursor, Read};
use std::sync::Arc;

use aiac_common::config::ServiceConfig;
use aiac_web::simulator::{InstantClock, APK_MIME_TYPE};
use aiac_web::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use helpers::{demo_archive, multipart_body, multipart_form, trainer_archive, ArchiveBuilder};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: router with instant stage pacing
fn setup_app() -> axum::Router {
    setup_app_with(ServiceConfig::default())
}

fn setup_app_with(config: ServiceConfig) -> axum::Router {
    build_router(AppState::with_clock(config, Arc::new(InstantClock)))
}

fn upload_request(uri: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let (content_type, body) = multipart_body("file", filename, bytes);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn compile_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/compile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

// =============================================================================
// Health / build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "aiac-web");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
    assert_eq!(body["pacing"], "instant");
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let request = Request::builder().uri("/api/buildinfo").body(Body::empty()).unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_index_served() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(extract_bytes(response).await).unwrap();
    assert!(html.contains("/static/app.js"));
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_demo_archive() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "demo.aia", &demo_archive()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File uploaded successfully");

    let info = &body["project_info"];
    assert_eq!(info["projectName"], "Demo");
    assert_eq!(info["screens"], json!(["Screen1", "Screen2"]));
    assert_eq!(info["components"], json!(["Button", "Label"]));
    assert_eq!(info["version"], "1.0");
    assert_eq!(info["filename"], "demo.aia");
    assert_eq!(info["missingComponents"], json!([]));
}

#[tokio::test]
async fn test_project_info_reports_missing_components() {
    let response = setup_app()
        .oneshot(upload_request("/project-info", "AITrainerComplete.aia", &trainer_archive()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body.get("message").is_none());

    let missing = &body["project_info"]["missingComponents"];
    assert_eq!(
        missing,
        &json!([
            {"component": "ImagePicker1", "screen": "Screen2", "componentType": "ImagePicker"},
            {"component": "Notifier1", "screen": "Screen2", "componentType": "Notifier"}
        ])
    );
}

#[tokio::test]
async fn test_upload_sanitizes_filename() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "../../My Project.aia", &demo_archive()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["project_info"]["filename"], "My_Project.aia");
}

#[tokio::test]
async fn test_upload_missing_descriptor_is_error() {
    let archive = ArchiveBuilder::new()
        .screen("Screen1", &[("Button1", "Button")])
        .build();
    let response = setup_app()
        .oneshot(upload_request("/upload", "demo.aia", &archive))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid AIA file: missing project.properties");
    assert!(body.get("project_info").is_none());
}

#[tokio::test]
async fn test_upload_not_a_zip() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "demo.aia", b"definitely not a zip"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "The file demo.aia is not a valid AIA (ZIP) file");
}

#[tokio::test]
async fn test_upload_wrong_extension() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Only .aia files are allowed");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "demo.aia", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "Uploaded file is empty");
}

#[tokio::test]
async fn test_upload_no_file_part() {
    let response = setup_app()
        .oneshot(upload_request_with_field("attachment", "demo.aia"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_two_files_rejected() {
    let archive = demo_archive();
    let (content_type, body) = multipart_form(&[
        ("file", "demo.aia", archive.as_slice()),
        ("file", "other.aia", archive.as_slice()),
    ]);

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Only one file may be uploaded per request");
}

fn upload_request_with_field(field: &str, filename: &str) -> Request<Body> {
    let (content_type, body) = multipart_body(field, filename, &demo_archive());
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_without_multipart_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_no_file_selected() {
    let response = setup_app()
        .oneshot(upload_request("/upload", "", &demo_archive()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "No file selected");
}

#[tokio::test]
async fn test_upload_over_body_limit_rejected() {
    let config = ServiceConfig {
        max_upload_bytes: 64,
        ..ServiceConfig::default()
    };
    let response = setup_app_with(config)
        .oneshot(upload_request("/upload", "demo.aia", &demo_archive()))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_server_survives_failed_request() {
    let app = setup_app();

    let bad = app
        .clone()
        .oneshot(upload_request("/upload", "demo.aia", b"junk"))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let good = app
        .oneshot(upload_request("/upload", "demo.aia", &demo_archive()))
        .await
        .unwrap();
    assert_eq!(good.status(), StatusCode::OK);
}

// =============================================================================
// Compile
// =============================================================================

fn compile_body() -> Value {
    json!({
        "projectName": "Demo",
        "filename": "demo.aia",
        "target": "10",
        "optimize": true,
        "components": ["Button", "Label"],
        "screens": ["Screen1", "Screen2"],
        "version": "1.0"
    })
}

#[tokio::test]
async fn test_compile_returns_package_download() {
    let response = setup_app()
        .oneshot(compile_request(compile_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], APK_MIME_TYPE);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Demo.apk\""
    );

    let bytes = extract_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("Package should be a zip");
    let mut manifest = String::new();
    archive
        .by_name("AndroidManifest.xml")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert!(manifest.contains("org.example.demo"));
    assert!(manifest.contains(r#"android:targetSdkVersion="29""#));
}

#[tokio::test]
async fn test_compile_includes_missing_component_warning() {
    let mut body = compile_body();
    body["missingComponents"] = json!([{"component": "Notifier1", "screen": "Screen2"}]);

    let response = setup_app().oneshot(compile_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = extract_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut readme = String::new();
    archive
        .by_name("assets/README.txt")
        .unwrap()
        .read_to_string(&mut readme)
        .unwrap();
    assert!(readme.contains("WARNING"));
    assert!(readme.contains("Notifier1 on Screen2"));
}

#[tokio::test]
async fn test_compile_missing_project_name() {
    let response = setup_app()
        .oneshot(compile_request(json!({"filename": "demo.aia"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing project information");
}

#[tokio::test]
async fn test_compile_missing_filename() {
    let response = setup_app()
        .oneshot(compile_request(json!({"projectName": "Demo"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "Missing filename");
}

#[tokio::test]
async fn test_compile_unsupported_target() {
    let mut body = compile_body();
    body["target"] = json!("2.3");

    let response = setup_app().oneshot(compile_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "Unsupported target platform: 2.3");
}

#[tokio::test]
async fn test_compile_malformed_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/compile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_compile_stages_endpoint() {
    let request = Request::builder()
        .uri("/api/compile/stages")
        .body(Body::empty())
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;

    let percents: Vec<u64> = body["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["percent"].as_u64().unwrap())
        .collect();
    assert_eq!(percents, vec![10, 25, 40, 60, 75, 90]);
    assert_eq!(body["completion"]["percent"], 100);
    assert_eq!(body["completion"]["message"], "Compilation completed successfully!");
    assert!(body["targets"].as_array().unwrap().contains(&json!("10")));
}
