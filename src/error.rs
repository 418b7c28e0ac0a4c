//! Error types for the orderly position-maintenance system.

use crate::types::{Position, RecordId};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Position of record {id} cannot move from {position} by {delta}")]
    PositionOutOfRange {
        id: RecordId,
        position: Position,
        delta: i32,
    },

    #[error("Record {0} has no position to increment")]
    PositionUnset(RecordId),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Record encoding error: {0}")]
    Codec(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

/// Errors raised by the ordering core and its configuration
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("No ordering scope registered for kind '{0}'")]
    UnknownKind(String),

    #[error("Ordering scope for kind '{0}' is already registered")]
    ScopeAlreadyRegistered(String),

    #[error("Invalid scope for kind '{kind}': {reason}")]
    InvalidScope { kind: String, reason: String },

    #[error("Record {0} has no position")]
    Unpositioned(RecordId),

    #[error("Record {id} expected a sibling at position {expected}, found none")]
    MissingNeighbor { id: RecordId, expected: Position },

    #[error("Records {id} and {other} both hold position {position}")]
    DuplicatePosition {
        id: RecordId,
        other: RecordId,
        position: Position,
    },

    #[error("Record {0} failed validation: {1}")]
    Validation(RecordId, String),

    #[error("Cannot destroy {id}: {count} dependent '{kind}' record(s) restrict deletion")]
    DeleteRestricted {
        id: RecordId,
        kind: String,
        count: usize,
    },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for OrderingError {
    fn from(err: config::ConfigError) -> Self {
        OrderingError::ConfigError(err.to_string())
    }
}
