//! Record Store
//!
//! The persistence boundary of the ordering core: document storage, equality and
//! range queries over positions, and per-record position increments.

pub mod memory;
pub mod persistence;

pub use memory::InMemoryRecordStore;
pub use persistence::SledRecordStore;

use crate::error::StorageError;
use crate::types::{OrderedRecord, Position, RecordId, ScopeValues};
use serde::{Deserialize, Serialize};

/// Comparison applied to a record's position.
///
/// Unset positions never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionFilter {
    Lt(Position),
    Gt(Position),
    Eq(Position),
}

impl PositionFilter {
    pub fn matches(&self, position: Option<Position>) -> bool {
        match (self, position) {
            (_, None) => false,
            (PositionFilter::Lt(x), Some(p)) => p < *x,
            (PositionFilter::Gt(x), Some(p)) => p > *x,
            (PositionFilter::Eq(x), Some(p)) => p == *x,
        }
    }
}

/// Equality predicate on kind and scope attributes, plus position filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub kind: String,
    pub scope: ScopeValues,
    pub exclude: Option<RecordId>,
    pub position: Vec<PositionFilter>,
}

impl RecordQuery {
    pub fn new(kind: impl Into<String>, scope: ScopeValues) -> Self {
        RecordQuery {
            kind: kind.into(),
            scope,
            exclude: None,
            position: Vec::new(),
        }
    }

    pub fn excluding(mut self, id: RecordId) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn filter(mut self, filter: PositionFilter) -> Self {
        self.position.push(filter);
        self
    }

    pub fn matches(&self, record: &OrderedRecord) -> bool {
        record.kind == self.kind
            && self.exclude != Some(record.id)
            && self
                .scope
                .iter()
                .all(|(attr, value)| record.attribute(attr) == *value)
            && self.position.iter().all(|f| f.matches(record.position))
    }
}

/// Sort records ascending by position (unset first), ties broken by id
pub fn sort_by_position(records: &mut [OrderedRecord]) {
    records.sort_by_key(|r| (r.position, r.id));
}

/// Shift a position by `delta`, refusing to go below zero
pub fn shift_position(
    id: RecordId,
    position: Option<Position>,
    delta: i32,
) -> Result<Position, StorageError> {
    let position = position.ok_or(StorageError::PositionUnset(id))?;
    position
        .checked_add_signed(delta)
        .ok_or(StorageError::PositionOutOfRange { id, position, delta })
}

/// Record Store interface
pub trait RecordStore {
    fn get(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError>;

    /// Insert or replace the whole record
    fn put(&self, record: &OrderedRecord) -> Result<(), StorageError>;

    /// Remove a record, returning what was stored
    fn remove(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError>;

    /// Records matching `query`, ascending by position
    fn find(&self, query: &RecordQuery) -> Result<Vec<OrderedRecord>, StorageError>;

    /// Atomically add `delta` to one record's position and return the new value
    fn inc_position(&self, id: RecordId, delta: i32) -> Result<Position, StorageError>;

    /// Allocate a fresh record id
    fn next_id(&self) -> Result<RecordId, StorageError>;
}
