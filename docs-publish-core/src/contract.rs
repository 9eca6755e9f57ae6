//! # contract: seams between the publishing pipeline and the outside world
//!
//! This module defines the traits the core logic talks through, together with the
//! plain data types that cross them:
//!
//! - [`ObjectStore`]: uploads a single local file to a bucket under a destination key.
//! - [`StoreConnector`]: builds an [`ObjectStore`] from a credentials file on disk.
//! - [`CommandRunner`]: runs an external program (git, the documentation generator).
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so tests can script uploads and command
//!   invocations without a network or a git binary.
//! - Mocks are exported under the `test-export-mocks` feature for downstream crates.
//!
//! ## Adding New Destinations
//! - Implement [`ObjectStore`] for the new backend and a [`StoreConnector`] that builds it.
//! - Convert every transport or API failure into an [`UploadError`]; the publisher records it
//!   against the file and moves on.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use mockall::automock;

/// Everything the store needs to upload one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    /// The bucket the object is written to.
    pub bucket: String,
    /// Full object name inside the bucket (the destination key).
    pub destination_key: String,
    /// Local file whose bytes become the object content.
    pub source_path: PathBuf,
    /// Value of the `Cache-Control` metadata on the stored object.
    pub cache_control: String,
    /// Compress the payload and store it with `Content-Encoding: gzip`.
    pub gzip: bool,
}

/// The object as reported back by the store after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    pub generation: Option<String>,
    pub size: Option<u64>,
}

/// Failure of a single upload. Never fatal to a batch.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode upload payload: {0}")]
    Encode(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("object store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Trait for uploading files into an object store bucket.
///
/// Uploading to a key that already exists overwrites the object; redeploys rely on this.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload one file. Implementors read `source_path` themselves.
    async fn upload(&self, req: ObjectUpload) -> Result<StoredObject, UploadError>;
}

/// Builds an [`ObjectStore`] once credentials have been written to disk.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, credentials: &Path) -> Result<Box<dyn ObjectStore>, UploadError>;
}

/// A fully described external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Substrings (tokens, credentials) masked whenever the command is displayed.
    pub redact: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn redacting(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.redact.push(secret);
        }
        self
    }

    /// Human-readable command line with every redacted value replaced by `***`.
    pub fn display(&self) -> String {
        let mut line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        for secret in &self.redact {
            line = line.replace(secret.as_str(), "***");
        }
        line
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },
}

/// Runs external programs to completion.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CommandRunner: Send + Sync {
    /// Run the command and fail unless it exits successfully.
    fn run(&self, spec: &CommandSpec) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_masks_redacted_values() {
        let spec = CommandSpec::new("git")
            .args(["push", "https://s3cret@github.com/o/r.git"])
            .redacting("s3cret");
        assert_eq!(spec.display(), "git push https://***@github.com/o/r.git");
    }

    #[test]
    fn empty_secret_is_not_registered() {
        let spec = CommandSpec::new("git").redacting("");
        assert!(spec.redact.is_empty());
    }
}
