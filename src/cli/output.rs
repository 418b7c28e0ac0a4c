//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{OrderingError, StorageError};

/// Map domain errors to a message for CLI output, with a hint where one helps.
pub fn map_error(e: &OrderingError) -> String {
    match e {
        OrderingError::UnknownKind(kind) => format!(
            "{}\nhint: declare it under [kinds.{}] in config/config.toml",
            e, kind
        ),
        OrderingError::StorageError(StorageError::RecordNotFound(_)) => {
            format!("{}\nhint: run `orderly list <kind>` to see record ids", e)
        }
        OrderingError::MissingNeighbor { .. } | OrderingError::DuplicatePosition { .. } => {
            format!("{}\nhint: run `orderly check` to find broken scope groups", e)
        }
        _ => e.to_string(),
    }
}
