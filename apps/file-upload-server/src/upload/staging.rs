//! Staging Writer
//!
//! Streams a request body into an exclusively created temp file next to the
//! destination. The body is copied chunk by chunk through a fixed-size
//! buffer, hashed on the way, and flushed before the file is handed to the
//! publisher.
//!
//! A temp file is owned by a [`TempFile`] guard from the moment it exists.
//! Every failure path removes it explicitly, and dropping the guard (for
//! example when the client disconnects and the request future is dropped)
//! removes it as well.

use std::fmt;
use std::io;
use std::path::Path;

use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{UploadError, UploadResult};

use super::types::{TempHandle, WRITE_BUFFER_SIZE};

// ============================================================================
// Temp File Guard
// ============================================================================

/// Ownership of a temp file on disk; removes it unless disarmed
#[derive(Debug)]
pub struct TempFile {
    handle: TempHandle,
    armed: bool,
}

impl TempFile {
    fn new(handle: TempHandle) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    pub fn handle(&self) -> &TempHandle {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        &self.handle.path
    }

    /// The file has been renamed away; nothing left to clean up
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }

    /// Delete the temp file now
    pub(crate) async fn discard(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.handle.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.handle.path.display(), "Removed temp file");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(
                    path = %self.handle.path.display(),
                    error = %e,
                    "Failed to remove temp file"
                );
            }
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.handle.path) {
            Ok(()) => tracing::warn!(
                path = %self.handle.path.display(),
                "Upload abandoned, removed temp file"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.handle.path.display(),
                error = %e,
                "Failed to remove abandoned temp file"
            ),
        }
    }
}

// ============================================================================
// Staged File
// ============================================================================

/// A fully written, closed temp file waiting to be published
#[derive(Debug)]
pub struct StagedFile {
    temp: TempFile,
    bytes_written: u64,
    sha256: String,
}

impl StagedFile {
    pub fn handle(&self) -> &TempHandle {
        self.temp.handle()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub(crate) fn into_temp(self) -> TempFile {
        self.temp
    }
}

// ============================================================================
// Stage
// ============================================================================

/// Write `body` into the temp file named by `handle`.
///
/// Fails if the temp file already exists. On any error the temp file is gone
/// by the time this returns.
pub async fn stage<S, B, E>(handle: TempHandle, body: S, sync_data: bool) -> UploadResult<StagedFile>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&handle.path)
        .await
        .map_err(|e| UploadError::Staging {
            path: handle.path.clone(),
            source: e,
        })?;

    let temp = TempFile::new(handle);

    match copy_body(file, temp.path(), body, sync_data).await {
        Ok((bytes_written, sha256)) => {
            tracing::debug!(
                path = %temp.path().display(),
                bytes = bytes_written,
                "Staged upload body"
            );
            Ok(StagedFile {
                temp,
                bytes_written,
                sha256,
            })
        }
        Err(e) => {
            temp.discard().await;
            Err(e)
        }
    }
}

/// Bounded-memory copy loop; the file is closed when this returns
async fn copy_body<S, B, E>(
    file: File,
    path: &Path,
    body: S,
    sync_data: bool,
) -> UploadResult<(u64, String)>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let staging_error = |source: io::Error| UploadError::Staging {
        path: path.to_path_buf(),
        source,
    };

    let mut body = std::pin::pin!(body);
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| UploadError::BodyRead {
            bytes_received: bytes_written,
            reason: e.to_string(),
        })?;
        let chunk = chunk.as_ref();
        if chunk.is_empty() {
            continue;
        }

        writer.write_all(chunk).await.map_err(staging_error)?;
        hasher.update(chunk);
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(staging_error)?;

    let mut file = writer.into_inner();
    if sync_data {
        file.sync_all().await.map_err(staging_error)?;
    }
    file.shutdown().await.map_err(staging_error)?;

    Ok((bytes_written, hex::encode(hasher.finalize())))
}
