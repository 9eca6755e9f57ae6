//! High-level pipeline: generate → stage → publish.
//!
//! This module ties the other modules together for one deploy run:
//!   - Installs and runs the documentation generator in the workspace
//!   - Copies the generated output into a staging directory outside the workspace
//!   - Publishes the staged tree to GitHub Pages (git) or a cloud bucket (object store)
//!
//! # Error Handling
//! Setup failures (generator, staging, credentials, git) return immediately. Upload failures
//! in the cloud path are collected first and reported once the whole batch has been tried.
//!
//! # Navigation
//! - Main entrypoint: [`deploy`]
//! - Cloud-only publishing of an existing directory: [`deploy_to_cloud`]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::{CloudConfig, DeployConfig, GeneratorConfig, Platform};
use crate::contract::{CommandError, CommandRunner, StoreConnector, UploadError};
use crate::credentials::{CredentialsError, CredentialsFile};
use crate::enumerate::{enumerate, EnumerateError};
use crate::generator::{self, GeneratorError};
use crate::pages::{self, PagesError};
use crate::publish::{publish, PublishError, PublishResult, UploadTarget};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("installing the documentation generator failed: {0}")]
    Install(#[source] CommandError),
    #[error("generating documentation failed: {0}")]
    Generate(#[source] CommandError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Enumerate(#[from] EnumerateError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("failed to connect to object store: {0}")]
    Connect(#[source] UploadError),
    #[error(transparent)]
    Pages(#[from] PagesError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("platform {0} selected but its settings are missing")]
    MissingPlatformConfig(Platform),
}

/// What a successful deploy did.
#[derive(Debug)]
pub struct DeployReport {
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub staged_files: usize,
    /// Upload records; only present for the cloud platform.
    pub published: Option<PublishResult>,
}

/// Install and run the generator in `workspace`; return the directory it wrote to.
pub fn generate_docs<R>(
    generator: &GeneratorConfig,
    workspace: &Path,
    runner: &R,
) -> Result<PathBuf, DeployError>
where
    R: CommandRunner + ?Sized,
{
    if generator.skip_install {
        info!("Skipping generator installation");
    } else {
        let install = generator::install_command(generator.version.as_deref()).current_dir(workspace);
        runner.run(&install).map_err(DeployError::Install)?;
    }

    let generate = generator::generate_command(generator)?.current_dir(workspace);
    runner.run(&generate).map_err(DeployError::Generate)?;

    let output_dir = generator::output_dir(generator, workspace)?;
    info!(output_dir = %output_dir.display(), "Documentation generated");
    Ok(output_dir)
}

/// Replace `staging` with a copy of every file under `source`. Returns the file count.
pub fn stage_output(source: &Path, staging: &Path) -> Result<usize, DeployError> {
    let stage_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| DeployError::Stage { path, source }
    };

    let files = enumerate(source, &HashSet::new())?;
    let src = source.canonicalize().map_err(stage_err(source))?;
    let dst = resolve_through_existing(staging).map_err(stage_err(staging))?;
    if src.starts_with(&dst) || dst.starts_with(&src) {
        error!(source = %src.display(), staging = %dst.display(), "Staging directory overlaps generator output");
        return Err(DeployError::Stage {
            path: staging.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "staging directory overlaps the generated output",
            ),
        });
    }
    if staging.exists() {
        std::fs::remove_dir_all(staging).map_err(stage_err(staging))?;
    }
    std::fs::create_dir_all(staging).map_err(stage_err(staging))?;

    for file in &files {
        let dest = staging.join(&file.relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(stage_err(parent))?;
        }
        std::fs::copy(&file.source_path, &dest).map_err(stage_err(&dest))?;
    }
    info!(
        source = %source.display(),
        staging = %staging.display(),
        files = files.len(),
        "Staged generated documentation"
    );
    Ok(files.len())
}

/// Absolute form of `path`, canonicalizing its deepest existing ancestor and appending the
/// components that do not exist yet.
fn resolve_through_existing(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        match existing.canonicalize() {
            Ok(base) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(base, |acc: PathBuf, part| acc.join(part)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    // A trailing `..` or the filesystem root; nothing left to resolve.
                    _ => return Ok(absolute),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Publish every file under `dir` to the configured bucket.
///
/// The credentials blob lives on disk only while this call runs. Returns
/// [`DeployError::Publish`] after the full batch if any upload failed.
pub async fn deploy_to_cloud<C>(
    cloud: &CloudConfig,
    dir: &Path,
    connector: &C,
) -> Result<PublishResult, DeployError>
where
    C: StoreConnector + ?Sized,
{
    let ignore: HashSet<String> = cloud.ignore.iter().cloned().collect();
    let files = enumerate(dir, &ignore)?;

    let credentials = CredentialsFile::write(&cloud.credentials)?;
    let store = connector
        .connect(credentials.path())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to construct object store client");
            DeployError::Connect(e)
        })?;

    let target = UploadTarget {
        destination_root: cloud.destination_folder.clone(),
        bucket: cloud.bucket.clone(),
        cache_policy: cloud.cache_policy,
    };
    let result = publish(&files, dir, &target, store.as_ref()).await;
    drop(credentials);

    if !result.is_success() {
        error!(
            errors = result.failure_count(),
            attempted = result.attempted(),
            "Publishing finished with failures"
        );
    }
    Ok(result.into_result()?)
}

/// Run the whole pipeline for `config`.
pub async fn deploy<R, C>(
    config: &DeployConfig,
    runner: &R,
    connector: &C,
) -> Result<DeployReport, DeployError>
where
    R: CommandRunner + ?Sized,
    C: StoreConnector + ?Sized,
{
    info!(platform = %config.platform, "[DEPLOY] Starting deploy pipeline");

    let output_dir = generate_docs(&config.generator, &config.workspace, runner)?;
    let staged_files = stage_output(&output_dir, &config.staging_dir)?;

    info!(platform = %config.platform, "[DEPLOY] Deploying to {}", config.platform);
    let published = match config.platform {
        Platform::GithubPages => {
            let pages = config
                .pages
                .as_ref()
                .ok_or(DeployError::MissingPlatformConfig(Platform::GithubPages))?;
            pages::deploy(pages, &config.staging_dir, runner)?;
            None
        }
        Platform::GoogleCloud => {
            let cloud = config
                .cloud
                .as_ref()
                .ok_or(DeployError::MissingPlatformConfig(Platform::GoogleCloud))?;
            Some(deploy_to_cloud(cloud, &config.staging_dir, connector).await?)
        }
    };

    info!(platform = %config.platform, staged_files, "[DEPLOY] Deploy complete");
    Ok(DeployReport {
        platform: config.platform,
        output_dir,
        staged_files,
        published,
    })
}
