//! Error types for the file upload server

use std::io;
use std::path::PathBuf;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for upload operations
pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Reasons an upload attempt ends in the `Failed` state
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Method not allowed: {0} (only PUT is accepted)")]
    MethodNotAllowed(Method),

    #[error("Invalid target path {path:?}: {reason}")]
    PathInvalid { path: String, reason: &'static str },

    #[error("Parent directory for {path} is unavailable: {source}")]
    ParentUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read request body after {bytes_received} bytes: {reason}")]
    BodyRead { bytes_received: u64, reason: String },

    #[error("Failed to stage {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to publish {} to {}: {source}", from.display(), to.display())]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    pub(crate) fn path_invalid(path: impl Into<String>, reason: &'static str) -> Self {
        Self::PathInvalid {
            path: path.into(),
            reason,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PathInvalid { .. } => StatusCode::BAD_REQUEST,
            Self::ParentUnavailable { .. } => StatusCode::CONFLICT,
            Self::BodyRead { .. } => StatusCode::BAD_REQUEST,
            Self::Staging { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Publish { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            Self::PathInvalid { .. } => "PATH_INVALID",
            Self::ParentUnavailable { .. } => "PARENT_UNAVAILABLE",
            Self::BodyRead { .. } => "BODY_READ_ERROR",
            Self::Staging { .. } => "STAGING_IO_ERROR",
            Self::Publish { .. } => "PUBLISH_IO_ERROR",
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "Upload failed: {}", self);
        } else {
            tracing::warn!(code = self.code(), "Upload rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });

        if matches!(self, Self::MethodNotAllowed(_)) {
            return (status, [(header::ALLOW, "PUT")], body).into_response();
        }

        (status, body).into_response()
    }
}

/// Errors that prevent the server from starting
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Storage root {} does NOT exist, please create it and make it writable", .0.display())]
    MissingRoot(PathBuf),

    #[error("Storage root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to inspect storage root {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },
}
