//! Error types for svc-bench identities.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while deriving a [`crate::ServiceIdentity`].
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The directory has no usable base name (e.g. `/` or a non UTF-8 name).
    #[error("directory has no usable name: {0}")]
    UnnamedDirectory(PathBuf),

    /// The lowercased name cannot be used as a hostname label or compose service.
    #[error("invalid service name {name:?} from {directory}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Directory the name was derived from.
        directory: PathBuf,
    },
}
