//! Workspace config files under `<workspace>/config/`

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Names the profile file layered over `config/config.toml`
pub const PROFILE_VAR: &str = "ORDERLY_ENV";
const DEFAULT_PROFILE: &str = "development";

/// Workspace config files that exist, lowest precedence first:
/// `config/config.toml`, then `config/{ORDERLY_ENV}.toml`.
pub fn workspace_config_files(workspace_root: &Path) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    let profile = std::env::var(PROFILE_VAR).unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
    [config_dir.join("config.toml"), config_dir.join(format!("{}.toml", profile))]
        .into_iter()
        .filter(|path| path.is_file())
        .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let files = workspace_config_files(workspace_root);
    if files.is_empty() {
        debug!(workspace = %workspace_root.display(), "No workspace configuration files");
    }
    Ok(files
        .into_iter()
        .fold(builder, |builder, path| builder.add_source(File::from(path).required(true))))
}
