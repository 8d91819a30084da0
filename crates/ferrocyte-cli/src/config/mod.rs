//! Configuration loading for the `ferrocyte` binary.
//! Reads ferrocyte.toml from the current directory, the path in
//! FERROCYTE_CONFIG, or an explicit `--config` path.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use ferrocyte_common::ClassifierConfig;

pub const CONFIG_ENV: &str = "FERROCYTE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ferrocyte.toml";

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`; must exist.
    Explicit(PathBuf),
    /// From FERROCYTE_CONFIG or the default file name; may be absent.
    Implicit(PathBuf),
}

/// Pick the config path: `--config` first, then FERROCYTE_CONFIG, then
/// ferrocyte.toml in the working directory.
pub fn resolve_source(explicit: Option<&Path>, env_value: Option<String>) -> ConfigSource {
    match explicit {
        Some(path) => ConfigSource::Explicit(path.to_path_buf()),
        None => ConfigSource::Implicit(PathBuf::from(
            env_value.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
        )),
    }
}

/// Load the classifier configuration.
///
/// A missing implicit file falls back to defaults with a warning; a missing
/// explicit file is an error.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<ClassifierConfig> {
    let source = resolve_source(explicit, std::env::var(CONFIG_ENV).ok());
    load_from(&source)
}

pub fn load_from(source: &ConfigSource) -> anyhow::Result<ClassifierConfig> {
    let path = match source {
        ConfigSource::Explicit(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            path
        }
        ConfigSource::Implicit(path) => {
            if !path.exists() {
                warn!("No config at {}; using defaults", path.display());
                return Ok(ClassifierConfig::default());
            }
            path
        }
    };

    let config = ClassifierConfig::from_path(path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    info!(
        "Configuration loaded from {} (quantile {}, tolerance {}, nmads {})",
        path.display(),
        config.quantile,
        config.fine_tune.tolerance,
        config.prune.nmads
    );
    Ok(config)
}
