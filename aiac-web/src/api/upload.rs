//! Upload Endpoint
//!
//! `POST /upload` and `POST /project-info` take a multipart form with a
//! single `file` field, inspect the archive in memory and return its
//! metadata. Nothing is written to disk.

use aiac_common::ProjectMetadata;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult, ValidationError};
use crate::inspector::{self, has_archive_extension, sanitize_filename};
use crate::AppState;

/// Multipart field carrying the archive
pub const FILE_FIELD: &str = "file";

/// Successful inspection response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub project_info: ProjectMetadata,
}

/// An archive received from a form
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// POST /upload
pub async fn upload_project(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let project_info = inspect_upload(multipart).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: Some("File uploaded successfully"),
        project_info,
    }))
}

/// POST /project-info
pub async fn project_info(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let project_info = inspect_upload(multipart).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: None,
        project_info,
    }))
}

async fn inspect_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ProjectMetadata> {
    // A request that is not a multipart form has no file part either.
    let multipart = multipart.map_err(|e| {
        debug!(reason = %e.body_text(), "Upload is not a multipart form");
        ValidationError::NoFilePart
    })?;
    let upload = read_single_file(multipart).await?;
    validate_upload(&upload)?;

    let filename = sanitize_filename(&upload.filename);
    info!(filename = %filename, bytes = upload.bytes.len(), "Received project archive");

    inspector::inspect_archive_blocking(upload.bytes, filename).await
}

/// Pull the one `file` field out of the form
///
/// Other fields are ignored; a second `file` field is rejected.
pub async fn read_single_file(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(ValidationError::MultipleFiles.into());
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    upload.ok_or_else(|| ValidationError::NoFilePart.into())
}

/// Name, extension and size checks, in that order
pub fn validate_upload(upload: &UploadedFile) -> Result<(), ValidationError> {
    if upload.filename.trim().is_empty() {
        return Err(ValidationError::NoFileSelected);
    }
    if !has_archive_extension(&upload.filename) {
        return Err(ValidationError::WrongExtension);
    }
    if upload.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    Ok(())
}

/// Upload routes, with the request body capped at `max_upload_bytes`
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_project))
        .route("/project-info", post(project_info))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
