///
/// This module implements the CLI interface for docs-publish: command parsing, argument
/// exposure (flags with GitHub Actions `INPUT_*` environment fallbacks), and the async
/// entrypoint used by `main` and the integration tests.
///
/// All pipeline logic (generation, staging, git and bucket publishing) lives in the
/// [`docs-publish-core`] crate. This module is CLI glue only.
///
/// ## How To Use
/// - In a workflow: run `docs-publish deploy`; every action input arrives as `INPUT_<NAME>`.
/// - Locally: pass the same values as flags, e.g. `docs-publish deploy --platform google_cloud
///   --bucket docs.example.com --credentials "$(cat key.json)"`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`docs-publish-core`]: ../../docs-publish-core/
use crate::gcs::GcsConnector;
use crate::load_config::{load_cloud_config, load_config, load_optional_settings};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docs_publish_core::config::DEFAULT_UPLOAD_TIMEOUT_SECS;
use docs_publish_core::deploy::{deploy, deploy_to_cloud};
use docs_publish_core::runner::SystemRunner;
use std::path::PathBuf;
use std::time::Duration;

/// CLI for docs-publish: generate documentation and publish it.
#[derive(Parser, Debug)]
#[clap(
    name = "docs-publish",
    version,
    about = "Generate documentation with jazzy and publish it to GitHub Pages or Google Cloud Storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the documentation, stage it, and publish it to the selected platform
    Deploy(DeployArgs),
    /// Upload an already generated directory to the storage bucket
    Publish(PublishArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeployArgs {
    /// YAML file with non-secret defaults for any of these options
    #[clap(long, env = "INPUT_SETTINGS")]
    pub settings: Option<String>,

    /// Publishing platform: github_pages (default) or google_cloud
    #[clap(long, env = "INPUT_PLATFORM")]
    pub platform: Option<String>,

    /// jazzy version to install
    #[clap(long, env = "INPUT_VERSION")]
    pub generator_version: Option<String>,

    /// jazzy config file (.yaml, .yml or .json), relative to the workspace
    #[clap(long, env = "INPUT_CONFIG")]
    pub generator_config: Option<String>,

    /// Raw argument string passed to jazzy
    #[clap(long, env = "INPUT_ARGS", allow_hyphen_values = true)]
    pub generator_args: Option<String>,

    /// Use the jazzy already on PATH instead of installing it
    #[clap(long)]
    pub skip_install: bool,

    /// Token used to push to the pages branch
    #[clap(long, env = "INPUT_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository as owner/name
    #[clap(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Name used for the pages commit
    #[clap(long, env = "GITHUB_ACTOR")]
    pub actor: Option<String>,

    /// Pages branch (default gh-pages)
    #[clap(long, env = "INPUT_BRANCH")]
    pub branch: Option<String>,

    /// Directory jazzy runs in (default: current directory)
    #[clap(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<String>,

    /// Where generated output is copied before publishing (default: <workspace>/../.docs)
    #[clap(long, env = "INPUT_STAGING_DIR")]
    pub staging_dir: Option<String>,

    #[clap(flatten)]
    pub cloud: CloudArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CloudArgs {
    /// Storage bucket the documentation is uploaded to
    #[clap(long, env = "INPUT_BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Service account key JSON
    #[clap(long, env = "INPUT_GOOGLE_CLOUD_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// Prefix for every object name in the bucket
    #[clap(long, env = "INPUT_DESTINATION_FOLDER")]
    pub destination_folder: Option<String>,

    /// long-lived (default) or no-cache
    #[clap(long, env = "INPUT_CACHE_POLICY")]
    pub cache_policy: Option<String>,

    /// Per-request upload timeout in seconds
    #[clap(long, env = "INPUT_UPLOAD_TIMEOUT")]
    pub upload_timeout: Option<String>,

    /// File names (not paths) to leave out of the upload, comma separated
    #[clap(long, env = "INPUT_IGNORE", value_delimiter = ',')]
    pub ignore: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Directory whose files are uploaded
    #[clap(long)]
    pub dir: PathBuf,

    /// YAML file with non-secret defaults
    #[clap(long, env = "INPUT_SETTINGS")]
    pub settings: Option<String>,

    #[clap(flatten)]
    pub cloud: CloudArgs,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Deploy(args) => {
            let config = load_config(&args)?;
            config.trace_loaded();
            let timeout = config
                .cloud
                .as_ref()
                .map(|c| c.upload_timeout)
                .unwrap_or(Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS));
            let connector = GcsConnector::new(timeout);

            match deploy(&config, &SystemRunner, &connector).await {
                Ok(report) => {
                    tracing::info!(
                        command = "deploy",
                        platform = %report.platform,
                        staged_files = report.staged_files,
                        "Deploy complete"
                    );
                    println!(
                        "Deployed {} files from {} to {}",
                        report.staged_files,
                        report.output_dir.display(),
                        report.platform
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "deploy", error = %e, "Deploy failed");
                    Err(anyhow::Error::new(e).context("deploy failed"))
                }
            }
        }
        Commands::Publish(args) => {
            let settings = load_optional_settings(args.settings.as_deref())?;
            let cloud = load_cloud_config(&args.cloud, &settings)?;
            tracing::info!(command = "publish", bucket = %cloud.bucket, dir = %args.dir.display(), "Publishing directory");
            let connector = GcsConnector::new(cloud.upload_timeout);
            let result = deploy_to_cloud(&cloud, &args.dir, &connector)
                .await
                .context("publish failed")?;
            println!(
                "Uploaded {} files to {}",
                result.success_count(),
                cloud.bucket
            );
            Ok(())
        }
    }
}

/// Format an error as a GitHub Actions `::error::` workflow command.
pub fn workflow_error(err: &anyhow::Error) -> String {
    let message = format!("{err:#}")
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{message}")
}
