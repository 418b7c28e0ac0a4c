//! Persistence layer for the Record Store

use crate::error::StorageError;
use crate::store::{shift_position, sort_by_position, RecordQuery, RecordStore};
use crate::types::{OrderedRecord, Position, RecordId};
use std::path::Path;

const RECORDS_TREE: &str = "records";

/// Sled-based implementation of RecordStore
pub struct SledRecordStore {
    db: sled::Db,
    records: sled::Tree,
}

impl SledRecordStore {
    /// Open (or create) a SledRecordStore at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Backend(format!("Failed to open sled database: {}", e)))?;
        Self::from_db(db)
    }

    /// Wrap an already opened database
    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let records = db.open_tree(RECORDS_TREE)?;
        Ok(Self { db, records })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Check if a record exists in the store
    pub fn contains(&self, id: RecordId) -> Result<bool, StorageError> {
        Ok(self.records.contains_key(id.to_key())?)
    }

    /// Every stored record, in id order
    pub fn list_all(&self) -> Result<Vec<OrderedRecord>, StorageError> {
        self.records
            .iter()
            .values()
            .map(|value| -> Result<OrderedRecord, StorageError> {
                Ok(bincode::deserialize(&value?)?)
            })
            .collect()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    fn get(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        match self.records.get(id.to_key())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &OrderedRecord) -> Result<(), StorageError> {
        let value = bincode::serialize(record)?;
        self.records.insert(record.id.to_key(), value)?;
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<Option<OrderedRecord>, StorageError> {
        match self.records.remove(id.to_key())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<OrderedRecord>, StorageError> {
        let mut found = Vec::new();
        for value in self.records.iter().values() {
            let record: OrderedRecord = bincode::deserialize(&value?)?;
            if query.matches(&record) {
                found.push(record);
            }
        }
        sort_by_position(&mut found);
        Ok(found)
    }

    fn inc_position(&self, id: RecordId, delta: i32) -> Result<Position, StorageError> {
        // The closure may run more than once under contention; the last run wins.
        let mut outcome: Result<Position, StorageError> = Err(StorageError::RecordNotFound(id));
        self.records.update_and_fetch(id.to_key(), |old| {
            let bytes = old?;
            let shifted = bincode::deserialize::<OrderedRecord>(bytes)
                .map_err(StorageError::from)
                .and_then(|mut record| {
                    let position = shift_position(id, record.position, delta)?;
                    record.position = Some(position);
                    Ok((position, bincode::serialize(&record)?))
                });
            match shifted {
                Ok((position, encoded)) => {
                    outcome = Ok(position);
                    Some(encoded)
                }
                Err(e) => {
                    outcome = Err(e);
                    Some(bytes.to_vec())
                }
            }
        })?;
        outcome
    }

    fn next_id(&self) -> Result<RecordId, StorageError> {
        // generate_id starts at 0; keep 0 out of circulation
        Ok(RecordId::new(self.db.generate_id()? + 1))
    }
}
