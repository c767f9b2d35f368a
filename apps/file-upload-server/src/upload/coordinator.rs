//! Upload Coordinator
//!
//! Drives one upload attempt through the protocol:
//!
//! ```text
//! Received -> Resolving -> CheckingExistence -> AlreadyPresent
//!                                            -> Staging -> Staged -> Publishing -> Committed
//! any step after Received may end in Failed
//! ```
//!
//! Attempts share nothing but the sequence allocator. There is no per-path
//! lock: the existence check only saves redundant work, and two uploads of
//! the same target race to the last rename.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::Stream;
use tracing::Instrument;

use crate::config::StorageConfig;
use crate::error::{UploadError, UploadResult};

use super::oracle;
use super::publish::publish;
use super::root::StorageRoot;
use super::sequence::SequenceAllocator;
use super::staging::stage;
use super::target::TargetPath;
use super::types::{
    CommitReceipt, TempHandle, UploadOutcome, UploadPhase, UploadRequest, UPLOAD_METHOD,
};

/// Behavior switches for the coordinator
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    /// Create missing intermediate directories of nested targets
    pub create_parent_dirs: bool,
    /// fsync staged data and the destination directory
    pub sync_data: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            create_parent_dirs: true,
            sync_data: true,
        }
    }
}

impl From<&StorageConfig> for UploadOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            create_parent_dirs: config.create_parent_dirs,
            sync_data: config.sync_data,
        }
    }
}

/// Runs upload attempts against one storage root
#[derive(Clone)]
pub struct UploadCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    root: StorageRoot,
    sequence: SequenceAllocator,
    options: UploadOptions,
}

impl UploadCoordinator {
    pub fn new(root: StorageRoot, options: UploadOptions) -> Self {
        Self::with_sequence(root, options, SequenceAllocator::new())
    }

    pub fn with_sequence(
        root: StorageRoot,
        options: UploadOptions,
        sequence: SequenceAllocator,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                root,
                sequence,
                options,
            }),
        }
    }

    pub fn root(&self) -> &StorageRoot {
        &self.inner.root
    }

    /// Run one attempt to a terminal state.
    ///
    /// Resolves only once the upload is committed, found already present, or
    /// has failed with every temp artifact removed.
    pub async fn upload<S, B, E>(&self, request: UploadRequest<S>) -> UploadResult<UploadOutcome>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let span = tracing::info_span!(
            "upload",
            method = %request.method,
            target = %request.target,
            sequence = tracing::field::Empty,
        );

        let result = self.run(request).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(UploadOutcome::Committed(receipt)) => tracing::info!(
                phase = %UploadPhase::Committed,
                bytes = receipt.bytes_written,
                sha256 = %receipt.sha256,
                "File {} uploaded",
                receipt.target
            ),
            Ok(UploadOutcome::AlreadyPresent { target }) => tracing::info!(
                phase = %UploadPhase::AlreadyPresent,
                "File {} already uploaded",
                target
            ),
            Err(e) => tracing::debug!(phase = %UploadPhase::Failed, error = %e, "Upload failed"),
        });

        result
    }

    async fn run<S, B, E>(&self, request: UploadRequest<S>) -> UploadResult<UploadOutcome>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let UploadRequest {
            method,
            target,
            body,
        } = request;
        let options = self.inner.options;

        transition(UploadPhase::Received);
        if method != UPLOAD_METHOD {
            return Err(UploadError::MethodNotAllowed(method));
        }
        let target = TargetPath::parse(&target)?;

        transition(UploadPhase::Resolving);
        let destination = self
            .inner
            .root
            .prepare_parent(&target, options.create_parent_dirs)
            .await?;

        transition(UploadPhase::CheckingExistence);
        if oracle::exists(&destination).await {
            return Ok(UploadOutcome::AlreadyPresent { target });
        }

        transition(UploadPhase::Staging);
        let sequence = self.inner.sequence.allocate();
        tracing::Span::current().record("sequence", sequence);
        let handle = TempHandle::new(&destination, sequence);
        let staged = stage(handle, body, options.sync_data).await?;

        transition(UploadPhase::Staged);
        let bytes_written = staged.bytes_written();
        let sha256 = staged.sha256().to_string();

        transition(UploadPhase::Publishing);
        publish(staged, &destination, options.sync_data).await?;

        Ok(UploadOutcome::Committed(CommitReceipt {
            target,
            sequence,
            bytes_written,
            sha256,
            committed_at: Utc::now(),
        }))
    }
}

fn transition(phase: UploadPhase) {
    tracing::debug!(phase = %phase, "Upload phase");
}
