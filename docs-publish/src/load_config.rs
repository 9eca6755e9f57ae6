/// `load_config` module: merges command-line flags, `INPUT_*` environment values and an optional
/// YAML settings file into the core [`DeployConfig`].
///
/// Flags and environment values win over the settings file. Secrets (the pages token and the
/// service account key) are only ever taken from flags or the environment, never from YAML.
///
/// GitHub Actions passes every declared input, so an unset input arrives as an empty string.
/// Empty values are treated as absent throughout.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use crate::cli::{CloudArgs, DeployArgs};
use anyhow::{anyhow, Context, Result};
use docs_publish_core::config::{
    CloudConfig, DeployConfig, GeneratorConfig, PagesConfig, Platform, RepoSlug, DEFAULT_BRANCH,
    DEFAULT_COMMIT_MESSAGE, DEFAULT_UPLOAD_TIMEOUT_SECS,
};
use docs_publish_core::publish::CachePolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Non-secret defaults read from a YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub platform: Option<Platform>,
    #[serde(default)]
    pub generator: GeneratorSettings,
    pub repository: Option<String>,
    pub actor: Option<String>,
    pub branch: Option<String>,
    pub commit_message: Option<String>,
    pub workspace: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub bucket: Option<String>,
    pub destination_folder: Option<String>,
    pub cache_policy: Option<CachePolicy>,
    pub upload_timeout_secs: Option<u64>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    pub version: Option<String>,
    pub config: Option<PathBuf>,
    pub args: Option<String>,
    #[serde(default)]
    pub skip_install: bool,
}

/// Reads and parses a YAML settings file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(settings_path = ?path_ref, "Loading settings from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, settings_path = ?path_ref, "Failed to read settings file");
            return Err(anyhow!("Failed to read settings file {:?}: {}", path_ref, e));
        }
    };

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(settings) => {
            info!(settings_path = ?path_ref, "Parsed settings YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, settings_path = ?path_ref, "Failed to parse settings YAML");
            Err(anyhow!("Failed to parse settings YAML {:?}: {e}", path_ref))
        }
    }
}

/// [`load_settings`] when a path was given, otherwise empty settings.
pub fn load_optional_settings(path: Option<&str>) -> Result<Settings> {
    match non_empty(path) {
        Some(path) => load_settings(path),
        None => Ok(Settings::default()),
    }
}

/// Builds the full deploy configuration from parsed arguments.
pub fn load_config(args: &DeployArgs) -> Result<DeployConfig> {
    let settings = load_optional_settings(args.settings.as_deref())?;

    let platform = match non_empty(args.platform.as_deref()) {
        Some(raw) => raw.parse::<Platform>()?,
        None => settings.platform.unwrap_or_default(),
    };

    let workspace = non_empty(args.workspace.as_deref())
        .map(PathBuf::from)
        .or_else(|| settings.workspace.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let staging_dir = non_empty(args.staging_dir.as_deref())
        .map(PathBuf::from)
        .or_else(|| settings.staging_dir.clone())
        .unwrap_or_else(|| workspace.join("..").join(".docs"));

    let generator = GeneratorConfig {
        version: pick(&args.generator_version, &settings.generator.version),
        config_file: non_empty(args.generator_config.as_deref())
            .map(PathBuf::from)
            .or_else(|| settings.generator.config.clone()),
        args: pick(&args.generator_args, &settings.generator.args),
        skip_install: args.skip_install || settings.generator.skip_install,
    };

    let (pages, cloud) = match platform {
        Platform::GithubPages => (Some(pages_config(args, &settings)?), None),
        Platform::GoogleCloud => (None, Some(load_cloud_config(&args.cloud, &settings)?)),
    };

    Ok(DeployConfig {
        generator,
        platform,
        pages,
        cloud,
        workspace,
        staging_dir,
    })
}

fn pages_config(args: &DeployArgs, settings: &Settings) -> Result<PagesConfig> {
    let token = non_empty(args.token.as_deref())
        .map(str::to_string)
        .context("github_pages needs a personal access token (--token or INPUT_PERSONAL_ACCESS_TOKEN)")?;
    let repository: RepoSlug = pick(&args.repository, &settings.repository)
        .context("github_pages needs a repository (--repository or GITHUB_REPOSITORY)")?
        .parse()?;
    let actor = pick(&args.actor, &settings.actor).unwrap_or_else(|| repository.owner.clone());

    Ok(PagesConfig {
        token,
        actor,
        branch: pick(&args.branch, &settings.branch).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        commit_message: settings
            .commit_message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
        repository,
    })
}

/// Builds the bucket publishing configuration from parsed arguments and settings.
pub fn load_cloud_config(args: &CloudArgs, settings: &Settings) -> Result<CloudConfig> {
    let bucket = pick(&args.bucket, &settings.bucket)
        .context("google_cloud needs a bucket (--bucket or INPUT_BUCKET_NAME)")?;
    let credentials = non_empty(args.credentials.as_deref())
        .map(str::to_string)
        .context("google_cloud needs service account credentials (--credentials or INPUT_GOOGLE_CLOUD_CREDENTIALS)")?;

    let cache_policy = match non_empty(args.cache_policy.as_deref()) {
        Some(raw) => raw.parse::<CachePolicy>().map_err(|e| anyhow!(e))?,
        None => settings.cache_policy.unwrap_or_default(),
    };

    let timeout_secs = match non_empty(args.upload_timeout.as_deref()) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid upload timeout '{raw}', expected seconds"))?,
        None => settings
            .upload_timeout_secs
            .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
    };
    if timeout_secs == 0 {
        error!("Upload timeout of zero seconds rejected");
        return Err(anyhow!("upload timeout must be at least one second"));
    }

    let flagged: Vec<String> = args
        .ignore
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let ignore = if flagged.is_empty() {
        settings.ignore.clone()
    } else {
        flagged
    };

    Ok(CloudConfig {
        bucket,
        credentials,
        destination_folder: pick(&args.destination_folder, &settings.destination_folder)
            .unwrap_or_default(),
        cache_policy,
        upload_timeout: Duration::from_secs(timeout_secs),
        ignore,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Flag or environment value if set, otherwise the settings value.
fn pick(flag: &Option<String>, setting: &Option<String>) -> Option<String> {
    non_empty(flag.as_deref())
        .or_else(|| non_empty(setting.as_deref()))
        .map(|v| v.trim().to_string())
}
