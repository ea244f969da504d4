//! Service directory resolution.
//!
//! Every directory below the root, at any depth, is a candidate service.

use std::path::{Path, PathBuf};
use svcbench_types::ServiceIdentity;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that stop resolution as a whole.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The root itself cannot be read.
    #[error("cannot read service root {root}: {source}")]
    Root {
        /// Root directory.
        root: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },

    /// The root exists but is not a directory.
    #[error("service root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Walk `root` and derive one identity per nested directory.
///
/// Entries are visited in file-name order, so the result is deterministic for a
/// fixed filesystem snapshot. Unreadable entries and directories whose names
/// cannot form an identity are logged and skipped.
///
/// # Errors
///
/// Fails only when `root` itself cannot be read.
pub fn resolve(
    root: &Path,
    health_url_template: &str,
) -> Result<Vec<ServiceIdentity>, ResolveError> {
    // A missing root is reported by the walk itself (depth 0 error).
    if let Ok(metadata) = std::fs::metadata(root) {
        if !metadata.is_dir() {
            return Err(ResolveError::NotADirectory(root.to_path_buf()));
        }
    }

    tracing::info!(root = %root.display(), "resolving service directories");

    let mut services = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ResolveError::Root {
                    root: root.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }

        match ServiceIdentity::from_directory(entry.path(), health_url_template) {
            Ok(identity) => {
                tracing::info!(
                    service = identity.name(),
                    directory = %entry.path().display(),
                    "found service directory"
                );
                services.push(identity);
            }
            Err(e) => {
                tracing::warn!(directory = %entry.path().display(), error = %e, "skipping directory");
            }
        }
    }

    Ok(services)
}
