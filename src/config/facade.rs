//! Entry point for loading configuration.

use super::merge::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::OrderlyConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Loads `OrderlyConfig` from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace
    /// `config/config.toml`, `config/{ORDERLY_ENV}.toml`, `ORDERLY__` environment.
    pub fn load(workspace_root: &Path) -> Result<OrderlyConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: OrderlyConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), kinds = config.kinds.len(), "configuration loaded");
        Ok(config)
    }

    /// Load an explicit config file on top of the defaults, skipping the
    /// global and workspace files.
    pub fn load_from_file(path: &Path) -> Result<OrderlyConfig, ConfigError> {
        let builder = builder_with_defaults()?.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);

        let config: OrderlyConfig = builder.build()?.try_deserialize()?;
        debug!(config_path = %path.display(), kinds = config.kinds.len(), "configuration loaded");
        Ok(config)
    }
}
