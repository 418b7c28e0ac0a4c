//! Configuration System
//!
//! Layered configuration: built-in defaults, the user's global file, workspace files
//! and `ORDERLY__` environment overrides. Besides storage and logging settings it
//! declares the ordering scope of every record kind.

use crate::logging::{parse_output, LoggingConfig};
use crate::scope::Dependent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::workspace_config_files;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderlyConfig {
    /// Record store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scope declarations keyed by record kind
    #[serde(default)]
    pub kinds: HashMap<String, KindConfig>,
}

/// Storage paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory, relative to the workspace unless absolute
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".orderly/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            self.store_path.clone()
        } else {
            workspace_root.join(&self.store_path)
        }
    }
}

/// Scope declaration of one record kind
///
/// ```toml
/// [kinds.child]
/// scope = ["parent"]
///
/// [kinds.child.relations.parent]
/// target = "parent"
/// dependent = "destroy"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Scope key names in declaration order; empty means one global group
    #[serde(default)]
    pub scope: Vec<String>,

    /// Scope keys that are relations to other kinds
    #[serde(default)]
    pub relations: HashMap<String, RelationConfig>,
}

/// A scope key backed by a reference to another record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Attribute holding the reference (default: `<name>_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// Kind of the referenced record (default: the relation name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// What destroying the referenced record does to this kind
    #[serde(default)]
    pub dependent: Dependent,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Kind(String, String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Kind(name, msg) => write!(f, "Kind '{}': {}", name, msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl KindConfig {
    fn validate(&self, kinds: &HashMap<String, KindConfig>) -> Vec<String> {
        let mut problems = Vec::new();

        let mut seen = std::collections::HashSet::new();
        for key in &self.scope {
            if key.is_empty() {
                problems.push("scope key names cannot be empty".to_string());
            } else if !seen.insert(key) {
                problems.push(format!("scope key '{}' is listed twice", key));
            }
        }

        let mut relations: Vec<_> = self.relations.iter().collect();
        relations.sort_by(|a, b| a.0.cmp(b.0));
        for (name, relation) in relations {
            if !self.scope.contains(name) {
                problems.push(format!("relation '{}' is not listed in scope", name));
            }
            let target = relation.target.as_deref().unwrap_or(name);
            if !kinds.contains_key(target) {
                problems.push(format!("relation '{}' targets unknown kind '{}'", name, target));
            }
            if relation.foreign_key.as_deref() == Some("") {
                problems.push(format!("relation '{}' has an empty foreign key", name));
            }
        }
        problems
    }
}

impl OrderlyConfig {
    /// Validate the entire configuration, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut kinds: Vec<_> = self.kinds.iter().collect();
        kinds.sort_by(|a, b| a.0.cmp(b.0));
        for (name, kind) in kinds {
            if name.is_empty() {
                errors.push(ValidationError::Kind(name.clone(), "kind name cannot be empty".to_string()));
            }
            for problem in kind.validate(&self.kinds) {
                errors.push(ValidationError::Kind(name.clone(), problem));
            }
        }

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("Store path cannot be empty".to_string()));
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            errors.push(ValidationError::Logging(format!(
                "Invalid log format '{}' (must be 'json' or 'text')",
                self.logging.format
            )));
        }
        if let Err(e) = parse_output(&self.logging.output) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
