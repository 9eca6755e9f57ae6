//! Scoped on-disk credentials for storage clients that only accept a key file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
#[error("failed to write credentials file in {dir}: {source}")]
pub struct CredentialsError {
    pub dir: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A credentials blob written to a private temporary file.
///
/// The file is deleted when the value is dropped.
pub struct CredentialsFile {
    file: NamedTempFile,
}

impl CredentialsFile {
    /// Write `contents` into the system temporary directory.
    pub fn write(contents: &str) -> Result<Self, CredentialsError> {
        Self::write_in(&std::env::temp_dir(), contents)
    }

    pub fn write_in(dir: &Path, contents: &str) -> Result<Self, CredentialsError> {
        let wrap = |source| {
            error!(dir = %dir.display(), error = ?source, "Failed to write credentials file");
            CredentialsError {
                dir: dir.to_path_buf(),
                source,
            }
        };
        let mut file = tempfile::Builder::new()
            .prefix("gc-credentials-")
            .suffix(".json")
            .tempfile_in(dir)
            .map_err(wrap)?;
        file.write_all(contents.as_bytes()).map_err(wrap)?;
        file.flush().map_err(wrap)?;
        debug!(path = %file.path().display(), "Wrote credentials file");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl std::fmt::Debug for CredentialsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsFile")
            .field("path", &self.path())
            .finish()
    }
}
