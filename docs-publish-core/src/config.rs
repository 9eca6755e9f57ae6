//! Typed deployment configuration, built once at startup and passed down explicitly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::publish::CachePolicy;

pub const DEFAULT_BRANCH: &str = "gh-pages";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Deploying Updated Jazzy Docs";
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown platform '{0}', expected 'github_pages' or 'google_cloud'")]
    UnknownPlatform(String),
    #[error("invalid repository '{0}', expected 'owner/name'")]
    InvalidRepository(String),
}

/// Publishing destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    #[serde(alias = "githubpages", alias = "github-pages")]
    GithubPages,
    #[serde(alias = "googlecloud", alias = "google-cloud")]
    GoogleCloud,
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github_pages" | "githubpages" | "github-pages" => Ok(Platform::GithubPages),
            "google_cloud" | "googlecloud" | "google-cloud" => Ok(Platform::GoogleCloud),
            other => Err(ConfigError::UnknownPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::GithubPages => f.write_str("github_pages"),
            Platform::GoogleCloud => f.write_str("google_cloud"),
        }
    }
}

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(RepoSlug {
                    owner: owner.to_string(),
                    name: name.trim_end_matches(".git").to_string(),
                })
            }
            _ => Err(ConfigError::InvalidRepository(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// How the documentation generator is installed and invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub version: Option<String>,
    /// Generator config file, relative to the workspace.
    pub config_file: Option<PathBuf>,
    /// Raw argument string passed to the generator.
    pub args: Option<String>,
    /// Skip `gem install`; the generator is already on PATH.
    pub skip_install: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PagesConfig {
    pub token: String,
    pub repository: RepoSlug,
    pub actor: String,
    pub branch: String,
    pub commit_message: String,
}

impl fmt::Debug for PagesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagesConfig")
            .field("token", &"***")
            .field("repository", &self.repository)
            .field("actor", &self.actor)
            .field("branch", &self.branch)
            .field("commit_message", &self.commit_message)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudConfig {
    pub bucket: String,
    /// Service account key blob; written to disk only for the duration of a publish.
    pub credentials: String,
    pub destination_folder: String,
    pub cache_policy: CachePolicy,
    pub upload_timeout: Duration,
    /// Bare file names left out of the upload.
    pub ignore: Vec<String>,
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("bucket", &self.bucket)
            .field("credentials", &"***")
            .field("destination_folder", &self.destination_folder)
            .field("cache_policy", &self.cache_policy)
            .field("upload_timeout", &self.upload_timeout)
            .field("ignore", &self.ignore)
            .finish()
    }
}

/// The top-level deploy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub generator: GeneratorConfig,
    pub platform: Platform,
    /// Present when `platform` is [`Platform::GithubPages`].
    pub pages: Option<PagesConfig>,
    /// Present when `platform` is [`Platform::GoogleCloud`].
    pub cloud: Option<CloudConfig>,
    /// Directory the generator runs in.
    pub workspace: PathBuf,
    /// Scratch directory the generated output is copied to before publishing.
    pub staging_dir: PathBuf,
}

impl DeployConfig {
    pub fn trace_loaded(&self) {
        info!(
            platform = %self.platform,
            workspace = %self.workspace.display(),
            staging_dir = %self.staging_dir.display(),
            "Loaded DeployConfig"
        );
        debug!(?self, "DeployConfig loaded (full debug)");
    }
}
