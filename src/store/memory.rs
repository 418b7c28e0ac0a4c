//! In-memory implementation of RecordStore

use crate::error::StorageError;
use crate::store::{shift_position, sort_by_position, RecordQuery, RecordStore};
use crate::types::{OrderedRecord, Position, RecordId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// HashMap-style store kept entirely in memory.
///
/// Suitable for tests and for hosts that persist records elsewhere.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<RecordId, OrderedRecord>>,
    next_id: AtomicU64,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        InMemoryRecordStore {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn put(&self, record: &OrderedRecord) -> Result<(), StorageError> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        Ok(self.records.write().remove(&id))
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<OrderedRecord>, StorageError> {
        let mut found: Vec<OrderedRecord> = self
            .records
            .read()
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_by_position(&mut found);
        Ok(found)
    }

    fn inc_position(&self, id: RecordId, delta: i32) -> Result<Position, StorageError> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StorageError::RecordNotFound(id))?;
        let position = shift_position(id, record.position, delta)?;
        record.position = Some(position);
        Ok(position)
    }

    fn next_id(&self) -> Result<RecordId, StorageError> {
        Ok(RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}
