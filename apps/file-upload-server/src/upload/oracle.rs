//! Existence check for committed uploads

use std::io;
use std::path::Path;

/// Whether `destination` already holds a committed file.
///
/// One metadata lookup. Any failure other than "not found" counts as present
/// so a destination is never overwritten on a guess.
pub async fn exists(destination: &Path) -> bool {
    match tokio::fs::symlink_metadata(destination).await {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(
                path = %destination.display(),
                error = %e,
                "Existence check failed, treating destination as present"
            );
            true
        }
    }
}
