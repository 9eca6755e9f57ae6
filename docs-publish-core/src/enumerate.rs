//! Recursive discovery of the files that make up a documentation build.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, info};
use walkdir::WalkDir;

/// A leaf file found under an enumeration root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    /// Path relative to the enumeration root, always `/`-separated.
    pub relative_path: String,
    /// Absolute location of the file on disk.
    pub source_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    #[error("enumeration root {0} does not exist or is not a directory")]
    NotFound(PathBuf),
    #[error("permission denied while reading {0}")]
    PermissionDenied(PathBuf),
    #[error("path {0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Walk `root` and return every non-directory entry whose file name is not in `ignore`.
///
/// Symbolic links are not followed: a link is reported as a leaf whatever it points at.
/// Entries are sorted by file name at every level, so the order is stable between runs.
/// Any unreadable directory or non-UTF-8 path fails the whole call; no partial listing is
/// returned.
pub fn enumerate(root: &Path, ignore: &HashSet<String>) -> Result<Vec<FileEntry>, EnumerateError> {
    let root = match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => root.canonicalize().map_err(|source| EnumerateError::Io {
            path: root.to_path_buf(),
            source,
        })?,
        Ok(_) => {
            error!(root = %root.display(), "Enumeration root is not a directory");
            return Err(EnumerateError::NotFound(root.to_path_buf()));
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(EnumerateError::PermissionDenied(root.to_path_buf()));
        }
        Err(e) => {
            error!(root = %root.display(), error = ?e, "Enumeration root is missing");
            return Err(EnumerateError::NotFound(root.to_path_buf()));
        }
    };

    let mut entries = Vec::new();
    for entry in WalkDir::new(&root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(&root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if ignore.contains(file_name.as_ref()) {
            debug!(path = %entry.path().display(), "Skipping ignored file");
            continue;
        }

        let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        let Some(relative_path) = to_forward_slashes(relative) else {
            error!(path = %entry.path().display(), "Path is not valid UTF-8");
            return Err(EnumerateError::NonUtf8Path(entry.path().to_path_buf()));
        };
        entries.push(FileEntry {
            relative_path,
            source_path: entry.path().to_path_buf(),
        });
    }

    info!(root = %root.display(), files = entries.len(), "Enumerated files");
    Ok(entries)
}

fn walk_error(root: &Path, e: walkdir::Error) -> EnumerateError {
    let path = e.path().unwrap_or(root).to_path_buf();
    error!(path = %path.display(), error = %e, "Failed to walk directory");
    match e.io_error().map(std::io::Error::kind) {
        Some(ErrorKind::PermissionDenied) => EnumerateError::PermissionDenied(path),
        _ => EnumerateError::Io {
            path,
            source: e.into(),
        },
    }
}

/// `None` when any component is not valid UTF-8.
fn to_forward_slashes(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
