//! Compile Endpoint
//!
//! `POST /compile` runs the simulator synchronously for the request and
//! returns the package bytes as an attachment. `GET /api/compile/stages`
//! exposes the stage table so the browser paces its progress bar from the
//! same data.

use aiac_common::CompileOptions;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::simulator::{
    completion_stage, pacing_stages, CompileSimulator, CompiledPackage, Stage, TargetPlatform,
    APK_MIME_TYPE,
};
use crate::AppState;

/// POST /compile
pub async fn compile_project(
    State(state): State<AppState>,
    body: Result<Json<CompileOptions>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(options) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let project = options.project_name.clone();
    let package = CompileSimulator::new(state.clock.as_ref())
        .run(&options, |update| {
            info!(project = %project, percent = update.percent, "{}", update.message);
        })
        .await?;

    package_response(package)
}

fn package_response(package: CompiledPackage) -> ApiResult<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(&package.file_name))
        .map_err(|e| ApiError::Internal(format!("Invalid download name: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(APK_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(package.bytes),
    )
        .into_response())
}

/// `attachment` disposition naming the download
///
/// The quoted `filename` is an ASCII approximation; `filename*` carries the
/// exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if ascii == file_name {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            percent_encode(file_name)
        )
    }
}

/// RFC 5987 value encoding
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// GET /api/compile/stages response
#[derive(Debug, Serialize)]
pub struct StagesResponse {
    /// Played before the compile request is sent
    pub stages: &'static [Stage],
    /// Shown once the package has arrived
    pub completion: &'static Stage,
    pub targets: Vec<&'static str>,
}

/// GET /api/compile/stages
pub async fn get_compile_stages() -> Json<StagesResponse> {
    Json(StagesResponse {
        stages: pacing_stages(),
        completion: completion_stage(),
        targets: TargetPlatform::supported().collect(),
    })
}

/// Build compile routes
pub fn compile_routes() -> Router<AppState> {
    Router::new()
        .route("/compile", post(compile_project))
        .route("/api/compile/stages", get(get_compile_stages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_disposition() {
        assert_eq!(
            content_disposition("AI Trainer.apk"),
            "attachment; filename=\"AI Trainer.apk\""
        );
    }

    #[test]
    fn test_quotes_are_replaced() {
        assert_eq!(
            content_disposition("a\"b.apk"),
            "attachment; filename=\"a_b.apk\"; filename*=UTF-8''a%22b.apk"
        );
    }

    #[test]
    fn test_utf8_disposition() {
        assert_eq!(
            content_disposition("Café.apk"),
            "attachment; filename=\"Caf_.apk\"; filename*=UTF-8''Caf%C3%A9.apk"
        );
    }
}
