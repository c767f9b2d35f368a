//! Upload types for the staging-and-commit protocol

use std::fmt;
use std::path::PathBuf;

use axum::http::Method;
use chrono::{DateTime, Utc};

use super::target::TargetPath;

// ============================================================================
// Constants
// ============================================================================

/// The only method that starts an upload
pub const UPLOAD_METHOD: Method = Method::PUT;

/// Upper bound on bytes buffered between the body stream and the temp file
pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;

// ============================================================================
// Request
// ============================================================================

/// One inbound upload as delivered by the transport layer
#[derive(Debug)]
pub struct UploadRequest<S> {
    /// Request method; anything but PUT fails before touching storage
    pub method: Method,

    /// Raw, still percent-encoded request path (e.g. `/a/b.txt`)
    pub target: String,

    /// Streaming request body
    pub body: S,
}

impl<S> UploadRequest<S> {
    pub fn new(method: Method, target: impl Into<String>, body: S) -> Self {
        Self {
            method,
            target: target.into(),
            body,
        }
    }
}

// ============================================================================
// Temp Handle
// ============================================================================

/// Identity of one staging attempt: `<destination>.<sequence>`
///
/// Always a sibling of the destination, so publishing is a same-directory
/// rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempHandle {
    pub sequence: u64,
    pub path: PathBuf,
}

impl TempHandle {
    pub fn new(destination: &std::path::Path, sequence: u64) -> Self {
        // Decimal text, never a char code point.
        let mut name = destination.as_os_str().to_owned();
        name.push(format!(".{}", sequence));

        Self {
            sequence,
            path: PathBuf::from(name),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Terminal success states of an upload attempt
///
/// Failures are reported as [`crate::error::UploadError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Destination already held a committed file; nothing was written
    AlreadyPresent { target: TargetPath },

    /// Body fully persisted and visible under the target path
    Committed(CommitReceipt),
}

impl UploadOutcome {
    /// Human-readable diagnostic for the caller
    pub fn message(&self) -> String {
        match self {
            Self::AlreadyPresent { target } => format!("File {} already uploaded", target),
            Self::Committed(receipt) => format!(
                "File {} stored ({} bytes)",
                receipt.target, receipt.bytes_written
            ),
        }
    }
}

/// Details of a committed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub target: TargetPath,

    /// Sequence of the temp handle that won the publish
    pub sequence: u64,

    pub bytes_written: u64,

    /// Hex SHA-256 of the committed bytes
    pub sha256: String,

    pub committed_at: DateTime<Utc>,
}

// ============================================================================
// Phases
// ============================================================================

/// States of the per-attempt upload state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Received,
    /// Lexically valid target; parent directory being prepared
    Resolving,
    CheckingExistence,
    AlreadyPresent,
    Staging,
    Staged,
    Publishing,
    Committed,
    Failed,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Resolving => "resolving",
            Self::CheckingExistence => "checking_existence",
            Self::AlreadyPresent => "already_present",
            Self::Staging => "staging",
            Self::Staged => "staged",
            Self::Publishing => "publishing",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
