//! Building the documentation generator's command lines and locating its output.
//!
//! The generator is `jazzy`, installed through RubyGems. Its output directory comes from, in
//! order: the `output` key of its config file, the `--output`/`-o` option in the raw argument
//! string, or `docs`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::contract::CommandSpec;

pub const GENERATOR_PROGRAM: &str = "jazzy";
pub const DEFAULT_OUTPUT_DIR: &str = "docs";

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("failed to read generator config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse generator config {path}: {message}")]
    ParseConfig { path: PathBuf, message: String },
    #[error("invalid generator arguments: {0}")]
    InvalidArgs(String),
}

/// The only key this crate reads from the generator's own config file.
#[derive(Debug, Default, Deserialize)]
struct GeneratorFile {
    #[serde(default)]
    output: Option<String>,
}

/// `sudo gem install jazzy [-v VERSION]`
pub fn install_command(version: Option<&str>) -> CommandSpec {
    let spec = CommandSpec::new("sudo").args(["gem", "install", GENERATOR_PROGRAM]);
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => spec.args(["-v", v]),
        None => spec,
    }
}

/// `jazzy --config FILE`, `jazzy ARGS...` or plain `jazzy`.
pub fn generate_command(config: &GeneratorConfig) -> Result<CommandSpec, GeneratorError> {
    let spec = CommandSpec::new(GENERATOR_PROGRAM);
    if let Some(file) = &config.config_file {
        return Ok(spec.arg("--config").arg(file.to_string_lossy()));
    }
    match non_empty(config.args.as_deref()) {
        Some(args) => Ok(spec.args(split_args(args)?)),
        None => Ok(spec),
    }
}

/// Directory the generator writes to, resolved against `workspace`.
pub fn output_dir(config: &GeneratorConfig, workspace: &Path) -> Result<PathBuf, GeneratorError> {
    if let Some(file) = &config.config_file {
        if let Some(output) = output_from_config_file(&workspace.join(file))? {
            info!(output = %output, "Output directory taken from generator config");
            return Ok(workspace.join(output));
        }
    }

    if let Some(args) = non_empty(config.args.as_deref()) {
        if let Some(output) = output_from_args(args)? {
            info!(output = %output, "Output directory taken from generator arguments");
            return Ok(workspace.join(output));
        }
    }

    debug!("Falling back to default output directory");
    Ok(workspace.join(DEFAULT_OUTPUT_DIR))
}

/// Read the `output` key from a YAML or JSON generator config, picked by file extension.
///
/// Unknown extensions are not sniffed and yield `None`.
pub fn output_from_config_file(path: &Path) -> Result<Option<String>, GeneratorError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !matches!(ext.as_str(), "yml" | "yaml" | "json") {
        warn!(path = %path.display(), "Unrecognised generator config extension; not reading output from it");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| GeneratorError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| GeneratorError::ParseConfig {
        path: path.to_path_buf(),
        message,
    };
    let parsed: Option<GeneratorFile> = if ext == "json" {
        serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
    } else {
        serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
    };
    Ok(parsed
        .and_then(|f| f.output)
        .filter(|o| !o.trim().is_empty()))
}

/// Find the value of `--output` (checked first) or `-o` in a raw argument string.
pub fn output_from_args(args: &str) -> Result<Option<String>, GeneratorError> {
    let tokens = split_args(args)?;
    Ok(option_value(&tokens, "--output").or_else(|| option_value(&tokens, "-o")))
}

fn option_value(tokens: &[String], flag: &str) -> Option<String> {
    let inline = format!("{flag}=");
    tokens.iter().enumerate().find_map(|(i, token)| {
        if token == flag {
            tokens.get(i + 1).cloned()
        } else {
            token.strip_prefix(inline.as_str()).map(str::to_string)
        }
    })
}

fn split_args(args: &str) -> Result<Vec<String>, GeneratorError> {
    shell_words::split(args).map_err(|e| GeneratorError::InvalidArgs(e.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
