//! CLI route: single route table and run context. Dispatches to the ordering API and presentation.

use crate::api::{Move, OrderingApi};
use crate::config::{workspace_config_files, ConfigLoader, OrderlyConfig};
use crate::error::{OrderingError, StorageError};
use crate::scope::ScopeRegistry;
use crate::store::SledRecordStore;
use crate::types::{ScopeValue, ScopeValues};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::parse::{Commands, MoveDirection};
use crate::cli::presentation::{
    format_density_reports_json, format_density_reports_text, format_destroy_summary,
    format_move_result, format_record, format_record_list,
};

/// Runtime context for CLI execution: workspace, configuration and the ordering API.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    api: OrderingApi,
    store: Arc<SledRecordStore>,
    config: OrderlyConfig,
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, OrderingError> {
        let config = load_config(&workspace_root, config_path.as_deref())?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            OrderingError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let registry = Arc::new(ScopeRegistry::from_config(&config)?);
        let store_path = config.storage.resolve_store_path(&workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = Arc::new(SledRecordStore::new(&store_path)?);
        debug!(store_path = %store_path.display(), kinds = config.kinds.len(), "run context ready");

        let api = OrderingApi::new(store.clone(), registry);
        Ok(Self {
            api,
            store,
            config,
            workspace_root,
            config_path,
        })
    }

    pub fn api(&self) -> &OrderingApi {
        &self.api
    }

    pub fn config(&self) -> &OrderlyConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands, json: bool) -> Result<String, OrderingError> {
        let output = match command {
            Commands::Create { kind, attributes } => {
                let record = self.api.create(kind, to_scope_values(attributes))?;
                format_record(&record, json)
            }
            Commands::Update { id, attributes } => {
                let record = self.api.update(*id, to_scope_values(attributes))?;
                format_record(&record, json)
            }
            Commands::Destroy { id } => {
                let summary = self.api.destroy(*id)?;
                format_destroy_summary(&summary, json)
            }
            Commands::List { kind, filters } => {
                let records = self.api.list(kind, to_scope_values(filters))?;
                format_record_list(kind, &records, json)
            }
            Commands::Move { id, direction } => {
                let request = match *direction {
                    MoveDirection::Up => Move::Up,
                    MoveDirection::Down => Move::Down,
                    MoveDirection::Top => Move::Top,
                    MoveDirection::Bottom => Move::Bottom,
                    MoveDirection::Above { other } => Move::Above(other),
                    MoveDirection::Below { other } => Move::Below(other),
                };
                let moved = self.api.move_record(*id, request)?;
                let record = self.api.get(*id)?;
                let group = self.api.siblings_and_self(*id)?;
                format_move_result(&record, moved, &group, json)
            }
            Commands::Check { kind } => {
                let kinds = match kind {
                    Some(kind) => vec![kind.clone()],
                    None => {
                        let mut kinds: Vec<String> = self.config.kinds.keys().cloned().collect();
                        kinds.sort();
                        kinds
                    }
                };
                let reports = kinds
                    .iter()
                    .map(|kind| self.api.verify(kind))
                    .collect::<Result<Vec<_>, _>>()?;
                if json {
                    format_density_reports_json(&reports)
                } else {
                    format_density_reports_text(&reports)
                }
            }
            Commands::Config => self.format_config(json)?,
        };

        if command.mutates() {
            self.store.flush()?;
        }
        info!(command = command.name(), "command completed");
        Ok(output)
    }

    fn format_config(&self, json: bool) -> Result<String, OrderingError> {
        if json {
            return serde_json::to_string_pretty(&self.config)
                .map_err(|e| OrderingError::ConfigError(e.to_string()));
        }
        let source = match &self.config_path {
            Some(path) => path.display().to_string(),
            None => {
                let files: Vec<String> = workspace_config_files(&self.workspace_root)
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                if files.is_empty() {
                    format!("defaults for {}", self.workspace_root.display())
                } else {
                    files.join(", ")
                }
            }
        };
        let body = toml::to_string_pretty(&self.config)
            .map_err(|e| OrderingError::ConfigError(e.to_string()))?;
        Ok(format!("# Effective configuration ({})\n# Valid\n\n{}", source, body))
    }
}

impl Commands {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Create { .. } => "create",
            Commands::Update { .. } => "update",
            Commands::Destroy { .. } => "destroy",
            Commands::List { .. } => "list",
            Commands::Move { .. } => "move",
            Commands::Check { .. } => "check",
            Commands::Config => "config",
        }
    }

    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Create { .. } | Commands::Update { .. } | Commands::Destroy { .. } | Commands::Move { .. }
        )
    }
}

/// Load configuration from an explicit file, or the layered workspace sources
pub fn load_config(workspace_root: &Path, config_path: Option<&Path>) -> Result<OrderlyConfig, OrderingError> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(workspace_root)?,
    };
    Ok(config)
}

fn to_scope_values(assignments: &[(String, ScopeValue)]) -> ScopeValues {
    assignments.iter().cloned().collect()
}
