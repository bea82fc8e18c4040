//! Input resolution: turn a user-supplied source path into the file to open.
//!
//! Candidates are tried in order, first existing one wins:
//!
//! 1. the path itself, when absolute
//! 2. the path relative to the current working directory
//! 3. the path relative to the configured base directory
//!
//! When nothing exists the working-directory candidate is returned anyway, so
//! the later [`PrintSizeError::FileNotFound`] names a meaningful location.

use crate::error::PrintSizeError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve `path` against the working directory and `base_dir`.
pub fn resolve_source(path: &Path, base_dir: Option<&Path>) -> PathBuf {
    if path.is_absolute() && path.exists() {
        return path.to_path_buf();
    }

    let cwd_candidate = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if cwd_candidate.exists() {
        return cwd_candidate;
    }

    if let Some(base) = base_dir {
        let base_candidate = base.join(path);
        if base_candidate.exists() {
            debug!("Resolved {} via base dir {}", path.display(), base.display());
            return base_candidate;
        }
    }

    cwd_candidate
}

/// Check that `path` is an existing, readable regular file.
pub fn ensure_readable(path: &Path) -> Result<(), PrintSizeError> {
    if !path.is_file() {
        return Err(PrintSizeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PrintSizeError::UnreadableFile {
                path: path.to_path_buf(),
                detail: format!("permission denied (try: chmod +r {path:?})"),
            })
        }
        Err(_) => Err(PrintSizeError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}
