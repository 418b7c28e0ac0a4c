//! CLI parse: clap types for orderly. No behavior; definitions only.

use crate::types::{RecordId, ScopeValue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// orderly - dense position ordering for scoped records
#[derive(Parser, Debug)]
#[command(name = "orderly")]
#[command(about = "Keep records densely ordered within their scope groups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a record at the end of its scope group
    Create {
        /// Record kind
        kind: String,
        /// Attribute assignment, e.g. `--set parent_id=@000000000000000a`
        #[arg(long = "set", value_parser = parse_assignment)]
        attributes: Vec<(String, ScopeValue)>,
    },
    /// Change attributes of a record; scope changes move it to the new group
    Update {
        id: RecordId,
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        attributes: Vec<(String, ScopeValue)>,
    },
    /// Destroy a record and cascade to its dependents
    Destroy { id: RecordId },
    /// List records of a kind in position order
    List {
        kind: String,
        /// Scope filter, e.g. `--where list=3`
        #[arg(long = "where", value_parser = parse_assignment)]
        filters: Vec<(String, ScopeValue)>,
    },
    /// Reorder a record within its scope group
    Move {
        id: RecordId,
        #[command(subcommand)]
        direction: MoveDirection,
    },
    /// Verify that every scope group is dense
    Check {
        /// Only check this kind
        kind: Option<String>,
    },
    /// Show the effective configuration and validate it
    Config,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Swap with the record directly above
    Up,
    /// Swap with the record directly below
    Down,
    /// Move above every sibling
    Top,
    /// Move below every sibling
    Bottom,
    /// Place directly above another record
    Above { other: RecordId },
    /// Place directly below another record
    Below { other: RecordId },
}

/// `name=value`, value in `ScopeValue::parse` syntax
pub fn parse_assignment(raw: &str) -> Result<(String, ScopeValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in '{}'", raw));
    }
    Ok((name.to_string(), ScopeValue::parse(value.trim())))
}
