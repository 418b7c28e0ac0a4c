//! Siblings Resolver
//!
//! Turns a record and its kind's scope declaration into query handles over the
//! record's scope-mates, ordered ascending by position.

use crate::error::{OrderingError, StorageError};
use crate::scope::ScopeRegistry;
use crate::store::{PositionFilter, RecordQuery, RecordStore};
use crate::types::{OrderedRecord, Position, ScopeValues};

/// Lazy query over a scope group.
///
/// Nothing is read until one of the terminal methods runs.
pub struct Siblings<'s> {
    store: &'s dyn RecordStore,
    query: RecordQuery,
}

impl<'s> Siblings<'s> {
    pub fn new(store: &'s dyn RecordStore, query: RecordQuery) -> Self {
        Siblings { store, query }
    }

    pub fn query(&self) -> &RecordQuery {
        &self.query
    }

    /// Restrict to `position < p`
    pub fn above(self, p: Position) -> Self {
        self.filter(PositionFilter::Lt(p))
    }

    /// Restrict to `position > p`
    pub fn below(self, p: Position) -> Self {
        self.filter(PositionFilter::Gt(p))
    }

    /// Restrict to `position == p`
    pub fn at(self, p: Position) -> Self {
        self.filter(PositionFilter::Eq(p))
    }

    pub fn filter(mut self, filter: PositionFilter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    pub fn fetch(&self) -> Result<Vec<OrderedRecord>, StorageError> {
        self.store.find(&self.query)
    }

    pub fn first(&self) -> Result<Option<OrderedRecord>, StorageError> {
        Ok(self.fetch()?.into_iter().next())
    }

    pub fn last(&self) -> Result<Option<OrderedRecord>, StorageError> {
        Ok(self.fetch()?.pop())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.fetch()?.is_empty())
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.fetch()?.len())
    }

    /// Highest stored position; `None` when empty or every position is unset
    pub fn max_position(&self) -> Result<Option<Position>, StorageError> {
        Ok(self.fetch()?.iter().filter_map(|r| r.position).max())
    }

    /// Shift every matched record by `delta`, returning how many were touched.
    ///
    /// Stops at the first failing increment; earlier increments stay applied.
    pub fn each_inc(&self, delta: i32) -> Result<usize, StorageError> {
        let matched = self.fetch()?;
        for record in &matched {
            self.store.inc_position(record.id, delta)?;
        }
        Ok(matched.len())
    }
}

/// Resolves a record's scope-mates
pub trait SiblingsResolver {
    /// Records sharing `record`'s scope values, excluding `record`.
    ///
    /// Attributes present in `scope_override` replace the record's own values.
    fn siblings(
        &self,
        record: &OrderedRecord,
        scope_override: Option<&ScopeValues>,
    ) -> Result<Siblings<'_>, OrderingError>;

    /// The record's scope group, including the record itself
    fn siblings_and_self(&self, record: &OrderedRecord) -> Result<Siblings<'_>, OrderingError>;

    /// True when both records currently belong to the same scope group
    fn sibling_of(&self, record: &OrderedRecord, other: &OrderedRecord)
        -> Result<bool, OrderingError>;
}

/// SiblingsResolver backed by a ScopeRegistry and a RecordStore
pub struct StoreSiblingsResolver<'a> {
    registry: &'a ScopeRegistry,
    store: &'a dyn RecordStore,
}

impl<'a> StoreSiblingsResolver<'a> {
    pub fn new(registry: &'a ScopeRegistry, store: &'a dyn RecordStore) -> Self {
        StoreSiblingsResolver { registry, store }
    }

    pub fn store(&self) -> &'a dyn RecordStore {
        self.store
    }

    pub fn registry(&self) -> &'a ScopeRegistry {
        self.registry
    }

    fn group_query(
        &self,
        record: &OrderedRecord,
        scope_override: Option<&ScopeValues>,
    ) -> Result<RecordQuery, OrderingError> {
        let scope = self.registry.get(&record.kind)?;
        let mut values = scope.group_values(record);
        if let Some(overrides) = scope_override {
            for (attr, value) in overrides {
                if let Some(slot) = values.get_mut(attr) {
                    *slot = value.clone();
                }
            }
        }
        Ok(RecordQuery::new(record.kind.clone(), values))
    }
}

impl SiblingsResolver for StoreSiblingsResolver<'_> {
    fn siblings(
        &self,
        record: &OrderedRecord,
        scope_override: Option<&ScopeValues>,
    ) -> Result<Siblings<'_>, OrderingError> {
        let query = self.group_query(record, scope_override)?.excluding(record.id);
        Ok(Siblings::new(self.store, query))
    }

    fn siblings_and_self(&self, record: &OrderedRecord) -> Result<Siblings<'_>, OrderingError> {
        let query = self.group_query(record, None)?;
        Ok(Siblings::new(self.store, query))
    }

    fn sibling_of(
        &self,
        record: &OrderedRecord,
        other: &OrderedRecord,
    ) -> Result<bool, OrderingError> {
        if record.kind != other.kind {
            return Ok(false);
        }
        let scope = self.registry.get(&record.kind)?;
        Ok(scope.group_values(record) == scope.group_values(other))
    }
}
