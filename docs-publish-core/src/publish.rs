//! Bulk publishing of enumerated files into an object store.
//!
//! [`publish`] uploads every [`FileEntry`] in order and never stops early: a failed upload is
//! recorded against its file and the loop moves on. Callers decide what a non-zero failure
//! count means through [`PublishResult::into_result`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{error, info};

use crate::contract::{ObjectStore, ObjectUpload};
use crate::enumerate::FileEntry;

pub const LONG_LIVED_CACHE_CONTROL: &str = "public, max-age=31536000";
pub const NO_CACHE_CONTROL: &str = "no-cache";

/// Cache policy applied to every object of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// For content that never changes under the same key.
    #[default]
    #[serde(alias = "long_lived")]
    LongLived,
    #[serde(alias = "no_cache")]
    NoCache,
}

impl CachePolicy {
    pub fn cache_control(&self) -> &'static str {
        match self {
            CachePolicy::LongLived => LONG_LIVED_CACHE_CONTROL,
            CachePolicy::NoCache => NO_CACHE_CONTROL,
        }
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long-lived" | "long_lived" => Ok(CachePolicy::LongLived),
            "no-cache" | "no_cache" => Ok(CachePolicy::NoCache),
            other => Err(format!(
                "unknown cache policy '{other}', expected 'long-lived' or 'no-cache'"
            )),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::LongLived => f.write_str("long-lived"),
            CachePolicy::NoCache => f.write_str("no-cache"),
        }
    }
}

/// Where and how a batch of files is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Prefix prepended to every relative path; may be empty.
    pub destination_root: String,
    pub bucket: String,
    pub cache_policy: CachePolicy,
}

/// Join a destination root and a relative path with exactly one `/`.
///
/// An empty root yields the relative path unchanged, never a leading separator.
pub fn destination_key(destination_root: &str, relative_path: &str) -> String {
    let root = destination_root.trim_matches('/');
    let relative = relative_path.trim_start_matches('/');
    if root.is_empty() {
        relative.to_string()
    } else {
        format!("{root}/{relative}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success,
    Failure(String),
}

/// One attempted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    pub entry: FileEntry,
    pub destination_key: String,
    pub outcome: UploadOutcome,
}

/// Outcome of a single [`publish`] call, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishResult {
    pub records: Vec<PublishRecord>,
}

impl PublishResult {
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    pub fn success_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == UploadOutcome::Success)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.attempted() - self.success_count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = FailedUpload> + '_ {
        self.records.iter().filter_map(|r| match &r.outcome {
            UploadOutcome::Success => None,
            UploadOutcome::Failure(reason) => Some(FailedUpload {
                relative_path: r.entry.relative_path.clone(),
                destination_key: r.destination_key.clone(),
                reason: reason.clone(),
            }),
        })
    }

    /// Turn a result with failures into a reportable [`PublishError::PartialFailure`].
    pub fn into_result(self) -> Result<PublishResult, PublishError> {
        let failed = self.failure_count();
        if failed == 0 {
            return Ok(self);
        }
        Err(PublishError::PartialFailure {
            failed,
            attempted: self.attempted(),
            failures: self.failures().collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub relative_path: String,
    pub destination_key: String,
    pub reason: String,
}

impl fmt::Display for FailedUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.relative_path, self.destination_key, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{failed} of {attempted} uploads failed: {}", summarize(.failures))]
    PartialFailure {
        failed: usize,
        attempted: usize,
        failures: Vec<FailedUpload>,
    },
}

fn summarize(failures: &[FailedUpload]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Upload `files` one at a time, resolving each against `source_root`.
///
/// Every file is attempted. Per-file errors are captured in the returned result and
/// never propagate.
pub async fn publish<S>(
    files: &[FileEntry],
    source_root: &Path,
    target: &UploadTarget,
    store: &S,
) -> PublishResult
where
    S: ObjectStore + ?Sized,
{
    info!(
        files = files.len(),
        bucket = %target.bucket,
        destination_root = %target.destination_root,
        cache_policy = %target.cache_policy,
        "Publishing files"
    );

    let mut records = Vec::with_capacity(files.len());
    for entry in files {
        let source_path = source_root.join(&entry.relative_path);
        let key = destination_key(&target.destination_root, &entry.relative_path);
        info!(source = %source_path.display(), destination = %key, "Uploading file");

        let req = ObjectUpload {
            bucket: target.bucket.clone(),
            destination_key: key.clone(),
            source_path: source_path.clone(),
            cache_control: target.cache_policy.cache_control().to_string(),
            gzip: true,
        };
        let outcome = match store.upload(req).await {
            Ok(stored) => {
                info!(destination = %key, generation = ?stored.generation, "Finished uploading file");
                UploadOutcome::Success
            }
            Err(e) => {
                error!(source = %source_path.display(), destination = %key, error = %e, "Error uploading file");
                UploadOutcome::Failure(e.to_string())
            }
        };
        records.push(PublishRecord {
            entry: entry.clone(),
            destination_key: key,
            outcome,
        });
    }

    let result = PublishResult { records };
    info!(
        uploaded = result.success_count(),
        errors = result.failure_count(),
        "Finished publishing with {} errors",
        result.failure_count()
    );
    result
}
