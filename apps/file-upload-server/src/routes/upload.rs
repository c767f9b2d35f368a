//! Upload Routes
//!
//! Every request lands here, whatever its path:
//! - PUT /<target> - Store the body under `<storage root>/<target>`
//! - anything else - 405 Method Not Allowed
//!
//! The response is sent only after the upload has reached a terminal state.

use axum::{
    body::Body,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::UploadError;
use crate::state::AppState;
use crate::upload::{UploadOutcome, UploadRequest};

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Committed,
    AlreadyPresent,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: UploadStatus,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
}

impl IntoResponse for UploadOutcome {
    fn into_response(self) -> Response {
        let message = self.message();
        match self {
            UploadOutcome::Committed(receipt) => (
                StatusCode::CREATED,
                Json(UploadResponse {
                    status: UploadStatus::Committed,
                    path: receipt.target.to_string(),
                    message,
                    size: Some(receipt.bytes_written),
                    sha256: Some(receipt.sha256),
                    committed_at: Some(receipt.committed_at),
                }),
            )
                .into_response(),
            UploadOutcome::AlreadyPresent { target } => (
                StatusCode::OK,
                Json(UploadResponse {
                    status: UploadStatus::AlreadyPresent,
                    path: target.to_string(),
                    message,
                    size: None,
                    sha256: None,
                    committed_at: None,
                }),
            )
                .into_response(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// PUT /*target
///
/// Stream the request body into storage and report the terminal outcome.
pub async fn receive_upload(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Result<UploadOutcome, UploadError> {
    let request = UploadRequest::new(method, uri.path(), body.into_data_stream());

    state.coordinator().upload(request).await
}
