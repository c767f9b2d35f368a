//! Request target parsing
//!
//! Turns a raw request path into a relative path that cannot climb out of
//! the storage root. Everything here is lexical; no filesystem call is made
//! before a target has been accepted.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{UploadError, UploadResult};

/// Validated, relative destination of an upload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPath {
    /// Decoded form with `/` separators, no leading slash
    display: String,
    relative: PathBuf,
}

impl TargetPath {
    /// Parse a raw (percent-encoded) request path such as `/a/b%20c.txt`
    pub fn parse(raw: &str) -> UploadResult<Self> {
        let decoded = urlencoding::decode(raw)
            .map_err(|_| UploadError::path_invalid(raw, "not valid UTF-8 after decoding"))?;

        let trimmed = decoded.strip_prefix('/').unwrap_or(&*decoded);

        if trimmed.is_empty() {
            return Err(UploadError::path_invalid(raw, "empty target"));
        }
        if trimmed.ends_with('/') {
            return Err(UploadError::path_invalid(raw, "target names a directory"));
        }

        let mut relative = PathBuf::new();
        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(UploadError::path_invalid(raw, "empty path segment")),
                "." | ".." => {
                    return Err(UploadError::path_invalid(raw, "relative path segment"))
                }
                s if s.contains('\0') => {
                    return Err(UploadError::path_invalid(raw, "NUL byte in path"))
                }
                s if s.contains('\\') => {
                    return Err(UploadError::path_invalid(raw, "backslash in path"))
                }
                s => relative.push(s),
            }
        }

        // Catches platform prefixes and roots that slipped through as segments.
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(UploadError::path_invalid(raw, "path escapes storage root"));
        }

        Ok(Self {
            display: trimmed.to_string(),
            relative,
        })
    }

    pub fn as_path(&self) -> &Path {
        &self.relative
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
