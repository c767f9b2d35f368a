//! Atomic Publisher
//!
//! Moves a staged temp file onto its destination with one `rename`. Temp
//! files are always siblings of their destination, so the rename never
//! crosses a filesystem and readers see either the old file, no file, or
//! the complete new one.
//!
//! Concurrent publishers of the same destination are not serialized; the
//! last rename to complete is what readers observe.

use std::path::Path;

use crate::error::{UploadError, UploadResult};

use super::staging::StagedFile;

/// Rename `staged` onto `destination`.
///
/// On failure the temp file is removed and an existing destination is left
/// untouched.
pub async fn publish(staged: StagedFile, destination: &Path, sync_data: bool) -> UploadResult<()> {
    let mut temp = staged.into_temp();

    if let Err(e) = tokio::fs::rename(temp.path(), destination).await {
        let error = UploadError::Publish {
            from: temp.path().to_path_buf(),
            to: destination.to_path_buf(),
            source: e,
        };
        temp.discard().await;
        return Err(error);
    }
    temp.disarm();

    if sync_data {
        sync_parent_dir(destination).await;
    }

    Ok(())
}

/// Persist the directory entry created by the rename.
///
/// The rename itself already succeeded, so a failure here is only logged.
#[cfg(unix)]
async fn sync_parent_dir(destination: &Path) {
    let Some(parent) = destination.parent() else {
        return;
    };

    let result: std::io::Result<()> = async {
        let dir = tokio::fs::File::open(parent).await?;
        dir.sync_all().await
    }
    .await;

    if let Err(e) = result {
        tracing::warn!(
            dir = %parent.display(),
            error = %e,
            "Failed to sync destination directory"
        );
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_destination: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::staging::stage;
    use crate::upload::types::TempHandle;
    use futures::stream;
    use std::io;
    use tempfile::TempDir;

    async fn staged(dir: &Path, name: &str, sequence: u64, data: &'static [u8]) -> StagedFile {
        let handle = TempHandle::new(&dir.join(name), sequence);
        stage(handle, stream::iter(vec![Ok::<_, io::Error>(data)]), false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_moves_temp_into_place() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("b.txt");
        let file = staged(temp_dir.path(), "b.txt", 10, b"hello").await;
        let temp_path = file.handle().path.clone();

        publish(file, &destination, true).await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"hello");
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_publish_replaces_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("b.txt");
        std::fs::write(&destination, b"old").unwrap();
        let file = staged(temp_dir.path(), "b.txt", 11, b"new").await;

        publish(file, &destination, false).await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_failed_publish_removes_temp_and_keeps_destination() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let destination = temp_dir.path().join("b.txt");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep"), b"kept").unwrap();
        let file = staged(temp_dir.path(), "b.txt", 12, b"data").await;
        let temp_path = file.handle().path.clone();

        let result = publish(file, &destination, false).await;

        assert!(matches!(result, Err(UploadError::Publish { .. })));
        assert!(!temp_path.exists());
        assert_eq!(std::fs::read(destination.join("keep")).unwrap(), b"kept");
    }
}
