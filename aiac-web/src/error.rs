//! Error types for aiac-web
//!
//! Three request-level error kinds exist. None of them is fatal to the
//! server; each is surfaced verbatim to the UI as a notice:
//! - [`ValidationError`]: bad or missing upload, wrong extension
//! - [`ParseError`]: malformed archive or descriptor
//! - [`CompileError`]: malformed compile options

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Upload and file-selection validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file part")]
    NoFilePart,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Only .aia files are allowed")]
    WrongExtension,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Only one file may be uploaded per request")]
    MultipleFiles,

    /// Client-side check, raised before any request is sent
    #[error("Please select a valid .aia file")]
    InvalidSelection,
}

/// Archive inspection failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("The file {0} is not a valid AIA (ZIP) file")]
    NotAnArchive(String),

    #[error("Invalid AIA file: missing project.properties")]
    MissingDescriptor,

    #[error("Invalid AIA file: missing src directory")]
    MissingSource,

    #[error("Invalid AIA file: no screens found")]
    NoScreens,

    #[error("Invalid AIA file: contents exceed {limit} bytes when extracted")]
    TooLarge { limit: u64 },

    #[error("Invalid AIA file: could not read {entry}: {reason}")]
    UnreadableEntry { entry: String, reason: String },
}

/// Compile request failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Missing project information")]
    MissingProjectName,

    #[error("Missing filename")]
    MissingFilename,

    #[error("Unsupported target platform: {0}")]
    UnsupportedTarget(String),

    #[error("Failed to generate APK file: {0}")]
    Package(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Request could not be decoded (400)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Compile(CompileError::Package(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Compile(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
