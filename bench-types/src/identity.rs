//! Service identities.
//!
//! A service is identified by the lowercased base name of its directory. The
//! same name is used as the discovery registry key, the lifecycle handle
//! (compose service name) and the `{name}` in the health URL template, so the
//! three never drift apart.

use crate::error::IdentityError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the service name in health URL templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// A service resolved from the service directory tree.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    name: String,
    health_url: String,
    discovery_key: String,
    lifecycle_handle: String,
    directory: PathBuf,
}

impl ServiceIdentity {
    /// Derive an identity from a service directory.
    ///
    /// The name is the lowercased base name of `directory`; `{name}` in
    /// `health_url_template` is replaced with it.
    pub fn from_directory(
        directory: &Path,
        health_url_template: &str,
    ) -> Result<Self, IdentityError> {
        let base = directory
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IdentityError::UnnamedDirectory(directory.to_path_buf()))?;

        let name = base.to_lowercase();
        let health_url = health_url_template.replace(NAME_PLACEHOLDER, &name);
        Self::new(name, health_url, directory)
    }

    /// Build an identity with an explicit health URL.
    pub fn new(
        name: impl Into<String>,
        health_url: impl Into<String>,
        directory: &Path,
    ) -> Result<Self, IdentityError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(IdentityError::InvalidName {
                name,
                directory: directory.to_path_buf(),
            });
        }

        Ok(Self {
            discovery_key: name.clone(),
            lifecycle_handle: name.clone(),
            name,
            health_url: health_url.into(),
            directory: directory.to_path_buf(),
        })
    }

    /// Service name (lowercased directory name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL of the application health endpoint.
    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Key queried in the discovery registry.
    pub fn discovery_key(&self) -> &str {
        &self.discovery_key
    }

    /// Handle passed to the orchestration tool (compose service name).
    pub fn lifecycle_handle(&self) -> &str {
        &self.lifecycle_handle
    }

    /// Directory the lifecycle commands run in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Names end up in hostnames, URL paths and `--scale <name>=N`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}
