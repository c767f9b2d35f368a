//! Storage root
//!
//! The directory all final and temp files live under. It is validated once at
//! startup and never changes afterwards.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{StartupError, UploadError, UploadResult};

use super::target::TargetPath;

#[derive(Debug, Clone)]
pub struct StorageRoot {
    /// Canonical, absolute form of the configured directory
    path: PathBuf,
}

impl StorageRoot {
    /// Open an existing directory as the storage root
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();

        let canonical = match tokio::fs::canonicalize(path).await {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StartupError::MissingRoot(path.to_path_buf()))
            }
            Err(e) => {
                return Err(StartupError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|e| StartupError::Io {
                path: canonical.clone(),
                source: e,
            })?;

        if !metadata.is_dir() {
            return Err(StartupError::NotADirectory(canonical));
        }

        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final location of a target under this root
    pub fn resolve(&self, target: &TargetPath) -> PathBuf {
        self.path.join(target.as_path())
    }

    /// Make sure the destination's parent directory exists and stays inside
    /// the root once symlinks are followed.
    ///
    /// The parent is walked one component at a time from the root. Each
    /// existing prefix is canonicalized and bound-checked before the next
    /// missing component is created, so nothing is ever created outside the
    /// root.
    ///
    /// Returns the destination path.
    pub async fn prepare_parent(
        &self,
        target: &TargetPath,
        create_missing: bool,
    ) -> UploadResult<PathBuf> {
        let relative_parent = match target.as_path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(self.resolve(target)),
        };
        let file_name = target.as_path().file_name().unwrap_or_default();

        let unavailable = |source: io::Error| UploadError::ParentUnavailable {
            path: target.to_string(),
            source,
        };

        // Always a canonical directory inside the root.
        let mut current = self.path.clone();

        for component in relative_parent.components() {
            let candidate = current.join(component);

            let canonical = match tokio::fs::canonicalize(&candidate).await {
                Ok(canonical) => canonical,
                Err(e) if e.kind() == io::ErrorKind::NotFound && create_missing => {
                    match tokio::fs::create_dir(&candidate).await {
                        Ok(()) => {
                            tracing::debug!(dir = %candidate.display(), "Created directory");
                        }
                        // Another upload got there first, or a dangling symlink
                        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                        Err(e) => return Err(unavailable(e)),
                    }
                    tokio::fs::canonicalize(&candidate)
                        .await
                        .map_err(unavailable)?
                }
                Err(e) => return Err(unavailable(e)),
            };

            if !canonical.starts_with(&self.path) {
                return Err(UploadError::path_invalid(
                    target.as_str(),
                    "path escapes storage root through a symlink",
                ));
            }

            let metadata = tokio::fs::metadata(&canonical)
                .await
                .map_err(unavailable)?;
            if !metadata.is_dir() {
                return Err(unavailable(io::Error::new(
                    io::ErrorKind::Other,
                    "parent is not a directory",
                )));
            }

            current = canonical;
        }

        Ok(current.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("uploaded");

        let result = StorageRoot::open(&missing).await;
        assert!(matches!(result, Err(StartupError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("uploaded");
        std::fs::write(&file, b"not a dir").unwrap();

        let result = StorageRoot::open(&file).await;
        assert!(matches!(result, Err(StartupError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_prepare_parent_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        let target = TargetPath::parse("/a/b/c.txt").unwrap();

        let destination = root.prepare_parent(&target, true).await.unwrap();

        assert_eq!(destination, root.path().join("a").join("b").join("c.txt"));
        assert!(root.path().join("a").join("b").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_parent_without_creation() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        let target = TargetPath::parse("/missing/c.txt").unwrap();

        let result = root.prepare_parent(&target, false).await;
        assert!(matches!(result, Err(UploadError::ParentUnavailable { .. })));
        assert!(!root.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_prepare_parent_blocked_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        std::fs::write(root.path().join("a"), b"file").unwrap();
        let target = TargetPath::parse("/a/b.txt").unwrap();

        let result = root.prepare_parent(&target, true).await;
        assert!(matches!(result, Err(UploadError::ParentUnavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_parent_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        let target = TargetPath::parse("/link/passwd").unwrap();

        let result = root.prepare_parent(&target, true).await;
        assert!(matches!(result, Err(UploadError::PathInvalid { .. })));
        assert!(!outside.path().join("passwd").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_parent_creates_nothing_behind_escaping_symlink() {
        let outside = TempDir::new().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        let target = TargetPath::parse("/link/newdir/deeper/passwd").unwrap();

        let result = root.prepare_parent(&target, true).await;

        assert!(matches!(result, Err(UploadError::PathInvalid { .. })));
        assert!(
            !outside.path().join("newdir").exists(),
            "directory created outside the storage root"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_parent_rejects_dangling_symlink() {
        let outside = TempDir::new().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        let gone = outside.path().join("gone");
        std::os::unix::fs::symlink(&gone, root.path().join("link")).unwrap();
        let target = TargetPath::parse("/link/deeper/passwd").unwrap();

        let result = root.prepare_parent(&target, true).await;

        assert!(matches!(result, Err(UploadError::ParentUnavailable { .. })));
        assert!(!gone.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_parent_follows_symlink_inside_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::open(temp_dir.path()).await.unwrap();
        std::fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias")).unwrap();
        let target = TargetPath::parse("/alias/sub/c.txt").unwrap();

        let destination = root.prepare_parent(&target, true).await.unwrap();

        assert_eq!(destination, root.path().join("real").join("sub").join("c.txt"));
        assert!(root.path().join("real").join("sub").is_dir());
    }
}
